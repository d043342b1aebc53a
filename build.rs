use std::env;

fn main() {
    let version = env::var("VERSION")
        .or_else(|_| env::var("CARGO_PKG_VERSION"))
        .unwrap_or("unknown".to_owned());
    println!("cargo:rerun-if-env-changed=VERSION");
    println!("cargo:rustc-env=TUNEDROP_VERSION={version}");
}
