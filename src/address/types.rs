// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address target classification and resolution results.

const PAY_ID_DELIMITER: char = '$';
const FIO_DELIMITER: char = '@';
const SUFFIX_CNS: &str = "crypto";
const SUFFIX_ENS: &str = "eth";

/// What kind of string a user typed into an address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    /// A plain chain address; nothing to resolve.
    NativePublic,
    /// `user$host`
    PayId,
    /// `name@domain`
    Fio,
    /// Unstoppable Domains `.crypto` name
    Cns,
    /// `.eth` name
    Ens,
}

impl AddressType {
    /// Classify `target`. Blank input has no type.
    ///
    /// Checked in order: CNS, ENS, PayID, FIO, then native.
    pub fn detect(target: &str) -> Option<Self> {
        if is_blank(target) {
            None
        } else if is_cns(target) {
            Some(AddressType::Cns)
        } else if is_ens(target) {
            Some(AddressType::Ens)
        } else if is_pay_id(target) {
            Some(AddressType::PayId)
        } else if is_fio(target) {
            Some(AddressType::Fio)
        } else {
            Some(AddressType::NativePublic)
        }
    }

    pub fn is_resolvable(self) -> bool {
        self != AddressType::NativePublic
    }

    pub fn is_unstoppable_domain(self) -> bool {
        matches!(self, AddressType::Cns | AddressType::Ens)
    }
}

/// Outcome of resolving a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressResult {
    Success {
        address: String,
        destination_tag: Option<String>,
    },
    /// The target is not something this service can resolve.
    Invalid,
    /// The service failed or could not be reached.
    ExternalError,
    /// The service answered but has no address for the currency.
    NoAddress,
}

impl AddressResult {
    pub fn success(address: impl Into<String>, destination_tag: Option<String>) -> Self {
        AddressResult::Success {
            address: address.into(),
            destination_tag,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AddressResult::Success { .. })
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn two_non_blank_parts(target: &str, delimiter: char) -> bool {
    let mut parts = target.split(delimiter);
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(a), Some(b), None) if !is_blank(a) && !is_blank(b)
    )
}

fn has_domain_suffix(target: &str, suffix: &str) -> bool {
    target
        .rsplit('.')
        .next()
        .is_some_and(|last| last.eq_ignore_ascii_case(suffix))
        && target.split('.').all(|part| !is_blank(part))
}

pub fn is_pay_id(target: &str) -> bool {
    two_non_blank_parts(target, PAY_ID_DELIMITER)
}

pub fn is_fio(target: &str) -> bool {
    two_non_blank_parts(target, FIO_DELIMITER)
}

pub fn is_cns(target: &str) -> bool {
    has_domain_suffix(target, SUFFIX_CNS)
}

pub fn is_ens(target: &str) -> bool {
    has_domain_suffix(target, SUFFIX_ENS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pay_id_detection() {
        for valid in [
            "GiveDirectly$payid.charity",
            "test5$payid.test.coinselect.com",
            "pay$wietse.com",
            "john.smith$dev.payid.es",
            "pay$zochow.ski",
        ] {
            assert!(is_pay_id(valid), "{valid}");
        }
        for invalid in [
            "",
            "test5payid.test.coinselect.com",
            "rAPERVgXZavGgiGv6xBgtiZurirW2yAmY",
            "0x2c4d5626b6559927350db12e50143e2e8b1b9951",
            "$payid.charity",
            "payid.charity$",
            "a$b$c",
        ] {
            assert!(!is_pay_id(invalid), "{invalid}");
        }
    }

    #[test]
    fn fio_detection() {
        assert!(is_fio("luke@stokes"));
        for invalid in ["", "invalid", "luke@", "@stokes", "a@b@c"] {
            assert!(!is_fio(invalid), "{invalid}");
        }
    }

    #[test]
    fn unstoppable_domain_detection() {
        assert!(is_ens("vitalik.eth"));
        assert!(is_ens("Vitalik.ETH"));
        assert!(is_cns("brad.crypto"));

        // A bare suffix is a single non-blank label and counts.
        assert!(is_ens("eth"));
        assert!(is_cns("crypto"));

        for invalid in ["", "unknown", "vitalik.com", ".eth", "vitalik.", "vitalik..eth"] {
            assert!(!is_ens(invalid), "{invalid}");
        }
        for invalid in ["", "unknown", "brad.com", ".crypto", "brad.", "brad..crypto"] {
            assert!(!is_cns(invalid), "{invalid}");
        }
    }

    #[test]
    fn detect_follows_priority_order() {
        assert_eq!(AddressType::detect("  "), None);
        assert_eq!(AddressType::detect("brad.crypto"), Some(AddressType::Cns));
        assert_eq!(AddressType::detect("vitalik.eth"), Some(AddressType::Ens));
        assert_eq!(AddressType::detect("pay$wietse.com"), Some(AddressType::PayId));
        assert_eq!(AddressType::detect("luke@stokes"), Some(AddressType::Fio));
        assert_eq!(
            AddressType::detect("0x2c4d5626b6559927350db12e50143e2e8b1b9951"),
            Some(AddressType::NativePublic)
        );
        // A PayID host ending in .eth is still an ENS name.
        assert_eq!(AddressType::detect("pay$wallet.eth"), Some(AddressType::Ens));
    }
}
