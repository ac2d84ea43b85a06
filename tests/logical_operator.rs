#[macro_use]
mod common;

#[cfg(test)]
mod logical_operator {
    // `and`/`or` produce the boolean outcome, never the operand itself.
    tests! {
        coercion in logical_operator is OK
        "false"
        "true"
        "true"
        "false"
    }

    tests! {
        short_circuit in logical_operator is OK
        "false"
        "1"
        "true"
        "1"
    }
}
