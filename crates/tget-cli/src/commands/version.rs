//! `tget version`: print version and build information

pub fn run() {
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("commit: {}", option_env!("TGET_COMMIT").unwrap_or("unknown"));
    println!("date: {}", option_env!("TGET_BUILD_DATE").unwrap_or("unknown"));
}
