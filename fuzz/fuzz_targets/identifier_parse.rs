//! Fuzz harness for `Address` and `MessageId` text parsing.
//!
//! Parsing must never panic, and anything that parses must print back to a
//! string that parses to the same value.

#![no_main]
use covrelay_core::{Address, MessageId};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(address) = text.parse::<Address>() {
        let printed = address.to_string();
        assert_eq!(printed.parse::<Address>().ok(), Some(address));
    }

    if let Ok(id) = text.parse::<MessageId>() {
        let printed = id.to_string();
        assert_eq!(printed.parse::<MessageId>().ok(), Some(id));
    }
});
