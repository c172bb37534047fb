//! Fuzz target for version validation and `git describe` splitting.
//!
//! Run with: cargo +nightly fuzz run fuzz_describe

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let describe = fwpush_version::Describe::parse(s);
    assert!(s.starts_with(describe.tag));

    if let Ok(version) = fwpush_version::Version::parse(s) {
        let flag = version.build_flag().to_string();
        assert!(flag.starts_with("-D AUTO_VERSION="));
        assert_eq!(version.is_dirty(), version.describe().dirty || version.as_str() == "-dirty");
    }
});
