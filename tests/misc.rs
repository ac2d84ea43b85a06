use assert_cmd::Command;

#[macro_use]
mod common;

#[cfg(test)]
mod misc {
    use super::*;

    tests! {
        empty in misc is OK
    }

    // Output produced before a runtime error stays on stdout; the failing
    // statement aborts the rest of the script.
    tests! {
        output_precedes_error in misc is ERR(70)
        "first"
        "[line 2] Runtime Error: Operands must be both numbers or both strings."
    }

    #[test]
    fn too_many_arguments_prints_usage() {
        Command::cargo_bin("loxide").unwrap()
            .args(["first.lox", "second.lox"])
            .assert()
            .stdout("Usage: loxide [script]\n")
            .code(64);
    }

    #[test]
    fn unreadable_script_exits_with_one() {
        Command::cargo_bin("loxide").unwrap()
            .arg("tests/target/misc/does_not_exist.lox")
            .assert()
            .code(1);
    }
}
