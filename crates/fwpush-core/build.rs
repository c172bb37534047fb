fn main() {
    // Embed the git describe version of fwpush itself. Builds from a source
    // tarball have no tags to describe.
    let describe = fwpush_version::derive_version()
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=FWPUSH_GIT_DESCRIBE={describe}");

    // Embed whether this is a debug or release build
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=FWPUSH_BUILD_PROFILE={profile}");

    // Re-run if git HEAD, tags or the index change
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs");
    println!("cargo:rerun-if-changed=../../.git/index");
}
