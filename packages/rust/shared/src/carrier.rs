//! Carrier classification and email-to-SMS gateway derivation.
//!
//! The gateway table is a static ordered list: exact matches win, then the
//! first entry whose name is a substring of the normalized company (or the
//! reverse). Order matters — "Metro by T-Mobile" must hit the Metro entry
//! before the T-Mobile one.

use crate::types::PhoneLookupResult;

/// Line-type markers that classify a number as mobile.
const MOBILE_MARKERS: [&str; 3] = ["CELL", "MOBILE", "WIRELESS"];

/// Built-in US carrier gateway domains, keyed by upper-case carrier name.
const BUILTIN_GATEWAYS: &[(&str, &str)] = &[
    ("VERIZON", "vtext.com"),
    ("AT&T", "txt.att.net"),
    ("METRO", "mymetropcs.com"),
    ("T-MOBILE", "tmomail.net"),
    ("SPRINT", "messaging.sprintpcs.com"),
    ("BOOST", "sms.myboostmobile.com"),
    ("CRICKET", "sms.cricketwireless.net"),
    ("US CELLULAR", "email.uscc.net"),
    ("CONSUMER CELLULAR", "mailmymobile.net"),
    ("VIRGIN", "vmobl.com"),
    ("XFINITY", "vtext.com"),
    ("STRAIGHT TALK", "vtext.com"),
    ("GOOGLE FI", "msg.fi.google.com"),
];

// ---------------------------------------------------------------------------
// CarrierGatewayTable
// ---------------------------------------------------------------------------

/// Immutable handle over an ordered carrier → gateway-domain mapping.
/// Constructed once and shared by reference for the process lifetime.
#[derive(Debug, Clone, Copy)]
pub struct CarrierGatewayTable {
    entries: &'static [(&'static str, &'static str)],
}

impl CarrierGatewayTable {
    /// Wrap a custom entry list. Entries must be upper-case names.
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// The built-in US carrier table.
    pub const fn builtin() -> Self {
        Self::new(BUILTIN_GATEWAYS)
    }

    /// Resolve the gateway domain for a raw company string.
    ///
    /// The company is trimmed and upper-cased, then matched exactly; failing
    /// that, the first entry in table order that is a substring of the
    /// company, or of which the company is a substring, wins.
    pub fn gateway_domain(&self, company: &str) -> Option<&'static str> {
        let normalized = company.trim().to_uppercase();
        if normalized.is_empty() {
            return None;
        }

        for (name, domain) in self.entries {
            if *name == normalized {
                return Some(domain);
            }
        }

        for (name, domain) in self.entries {
            if normalized.contains(name) || name.contains(normalized.as_str()) {
                return Some(domain);
            }
        }

        None
    }
}

impl Default for CarrierGatewayTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

/// True when the line type reads as a mobile line (contains CELL, MOBILE,
/// or WIRELESS in any case). Empty input is not mobile.
pub fn is_mobile_line(line_type: &str) -> bool {
    let upper = line_type.to_uppercase();
    MOBILE_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Keep only ASCII digits, dropping formatting like `(555) 123-4567`.
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Build the `<digits>@<gateway>` address, or empty when the carrier is
/// unrecognized or the phone carries no digits.
pub fn sms_gateway(phone: &str, company: &str, table: &CarrierGatewayTable) -> String {
    let digits = digits_only(phone);
    if digits.is_empty() {
        return String::new();
    }
    match table.gateway_domain(company) {
        Some(domain) => format!("{digits}@{domain}"),
        None => String::new(),
    }
}

impl PhoneLookupResult {
    /// Fill the derived fields. `carrier` always mirrors `company`;
    /// `is_mobile` and `sms_gateway` are computed only for clean results so
    /// a failed lookup never reports derived data.
    pub fn with_derived(mut self, table: &CarrierGatewayTable) -> Self {
        self.carrier = self.company.clone();
        if self.error.is_empty() {
            self.is_mobile = is_mobile_line(&self.line_type);
            self.sms_gateway = sms_gateway(&self.phone, &self.company, table);
        } else {
            self.is_mobile = false;
            self.sms_gateway = String::new();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_markers_any_case() {
        assert!(is_mobile_line("Wireless"));
        assert!(is_mobile_line("CELL PHONE"));
        assert!(is_mobile_line("mobile"));
        assert!(is_mobile_line("Cellular"));
        assert!(!is_mobile_line("Landline"));
        assert!(!is_mobile_line(""));
    }

    #[test]
    fn digits_strip_formatting() {
        assert_eq!(digits_only("(555) 123-4567"), "5551234567");
        assert_eq!(digits_only("+1 555.123.4567"), "15551234567");
        assert_eq!(digits_only("no digits"), "");
    }

    #[test]
    fn verizon_wireless_gateway() {
        let table = CarrierGatewayTable::builtin();
        assert_eq!(
            sms_gateway("5551234567", "Verizon Wireless", &table),
            "5551234567@vtext.com"
        );
    }

    #[test]
    fn unknown_carrier_is_empty() {
        let table = CarrierGatewayTable::builtin();
        assert_eq!(sms_gateway("5551234567", "Some Rural Co-op", &table), "");
    }

    #[test]
    fn empty_company_never_matches() {
        let table = CarrierGatewayTable::builtin();
        assert_eq!(table.gateway_domain(""), None);
        assert_eq!(table.gateway_domain("   "), None);
    }

    #[test]
    fn digitless_phone_is_empty() {
        let table = CarrierGatewayTable::builtin();
        assert_eq!(sms_gateway("", "Verizon", &table), "");
    }

    #[test]
    fn table_order_resolves_overlaps() {
        let table = CarrierGatewayTable::builtin();
        // Contains both METRO and T-MOBILE; the earlier entry wins.
        assert_eq!(
            table.gateway_domain("Metro by T-Mobile"),
            Some("mymetropcs.com")
        );
        assert_eq!(
            table.gateway_domain("T-Mobile USA, Inc."),
            Some("tmomail.net")
        );
    }

    #[test]
    fn derivations_skip_failed_results() {
        let table = CarrierGatewayTable::builtin();
        let result = PhoneLookupResult {
            phone: "5551234567".into(),
            line_type: "Wireless".into(),
            company: "Verizon Wireless".into(),
            error: "failed to read location".into(),
            ..Default::default()
        }
        .with_derived(&table);

        assert!(!result.is_mobile);
        assert_eq!(result.sms_gateway, "");
        assert_eq!(result.carrier, "Verizon Wireless");
    }

    #[test]
    fn derivations_fill_clean_results() {
        let table = CarrierGatewayTable::builtin();
        let result = PhoneLookupResult {
            phone: "(555) 123-4567".into(),
            line_type: "Wireless".into(),
            company: "AT&T Mobility".into(),
            ..Default::default()
        }
        .with_derived(&table);

        assert!(result.is_mobile);
        assert_eq!(result.sms_gateway, "5551234567@txt.att.net");
        assert_eq!(result.carrier, "AT&T Mobility");
    }
}
