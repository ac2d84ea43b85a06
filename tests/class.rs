#[macro_use]
mod common;

#[cfg(test)]
mod class {
    tests! {
        cake in class is OK
        "The German chocolate cake is delicious!"
    }

    tests! {
        greet in class is OK
        "hello world"
    }

    tests! {
        display in class is OK
        "Dessert class"
        "Dessert instance"
    }

    tests! {
        init_arity in class is ERR(70)
        "[line 4] Runtime Error: Expected 1 arguments but got 0."
    }

    tests! {
        init_hidden in class is ERR(70)
        "[line 4] Runtime Error: Undefined property 'init'."
    }
}
