/// Runs a fixture script from `tests/target/<scope>/<name>.lox` against the
/// compiled binary and checks its stdout line by line.
///
/// `OK` expects a clean exit; `ERR(code)` expects the given exit code.
/// Error messages land on stdout too, so a failing script asserts the
/// regular output followed by the diagnostic lines.
#[macro_export]
macro_rules! tests {
    ($file:ident in $scope:ident is OK $($expected:expr)*) => {
        #[test]
        fn $file() {
            use assert_cmd::Command;

            let mut expected: Vec<&str> = vec![$($expected),*];

            // If there are expected lines, the output ends with a newline.
            let expected = match expected.len() {
                0 => String::new(),
                _ => {
                    expected.push("");
                    expected.join("\n")
                }
            };

            let file = format!("tests/target/{}/{}.lox", stringify!($scope), stringify!($file));

            Command::cargo_bin("loxide").unwrap()
                .arg(file)
                .assert()
                .stdout(expected)
                .success();
        }
    };

    ($file:ident in $scope:ident is ERR($code:expr) $($expected:expr)+) => {
        #[test]
        fn $file() {
            use assert_cmd::Command;

            let mut expected: Vec<&str> = vec![$($expected),+];
            expected.push("");
            let expected = expected.join("\n");

            let file = format!("tests/target/{}/{}.lox", stringify!($scope), stringify!($file));

            Command::cargo_bin("loxide").unwrap()
                .arg(file)
                .assert()
                .stdout(expected)
                .code($code);
        }
    };
}
