fn main() {
    // MultitouchSupport is a private framework and is not on the default search path
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos") {
        println!("cargo:rustc-link-search=framework=/System/Library/PrivateFrameworks");
        println!("cargo:rustc-link-lib=framework=CoreFoundation");
    }
}
