#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Never panics; every yielded name is a valid identifier tail.
    for name in ctester::scanner::Scanner::new(data) {
        assert!(ctester::TestName::new(name.as_str()).is_ok());
    }
});
