//! CLI surface specs for the `yggd` binary.

use crate::prelude::*;

#[test]
fn version_flag_prints_the_crate_version_and_exits_zero() {
    yggd_cmd(&["--version"]).run().passes().stdout_has("yggd");
}

#[test]
fn help_flag_describes_usage_and_exits_zero() {
    yggd_cmd(&["--help"]).run().passes().stdout_has("USAGE");
}

#[test]
fn unexpected_argument_is_rejected() {
    yggd_cmd(&["--bogus-flag"]).run().fails_with(1);
}
