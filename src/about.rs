/// Version string shown by `--version` in every tool.
pub const VERSION_TEXT: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (build ",
    env!("MULTIMER_PREP_BUILD_N"),
    ")"
);
