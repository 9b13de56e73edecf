//! Selector fallback chains for the phonevalidator.com lookup page.
//!
//! The page is not under our control and its markup has shifted before, so
//! every interactive element is located through an ordered chain of
//! strategies, most specific first. Chains are plain data; updating a selector
//! after a page change never touches engine control flow.

use std::fmt;

/// One element-location strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Match by `id` attribute.
    Id(&'static str),
    /// Match by a single CSS class name.
    Class(&'static str),
    /// Match by CSS selector.
    Css(&'static str),
    /// Match by tag name.
    Tag(&'static str),
    /// Match by XPath expression.
    XPath(&'static str),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "id={id}"),
            Selector::Class(name) => write!(f, "class={name}"),
            Selector::Css(css) => write!(f, "css={css}"),
            Selector::Tag(tag) => write!(f, "tag={tag}"),
            Selector::XPath(xpath) => write!(f, "xpath={xpath}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Interaction chains
// ---------------------------------------------------------------------------

/// Candidates for the phone-number input, most specific first.
pub const PHONE_INPUT_CHAIN: [Selector; 5] = [
    Selector::Id("GpofOvnvs"),
    Selector::Class("phone-input"),
    Selector::Css("input.form-control.form-b.phone-input.a-form"),
    Selector::Tag("input"),
    Selector::XPath("//input[@type='text']"),
];

/// Candidates for the search/submit control, most specific first.
pub const SEARCH_BUTTON_CHAIN: [Selector; 5] = [
    Selector::Id("CaptchaCheck"),
    Selector::Class("btn-primary"),
    Selector::Css("input#CaptchaCheck.btn.btn-primary[type='submit']"),
    Selector::XPath("//button[@type='submit']"),
    Selector::XPath("//input[@type='submit']"),
];

// ---------------------------------------------------------------------------
// Result-panel anchors
// ---------------------------------------------------------------------------

/// Echoed phone number on the results panel. Also serves as the signal that
/// the panel has rendered at all.
pub const PHONE_NUMBER_LABEL: Selector = Selector::Id("ContentPlaceHolder1_NumberLabel");

/// Report date on the results panel.
pub const REPORT_DATE_LABEL: Selector = Selector::Id("ContentPlaceHolder1_ReportDateLabel");

/// Line type ("Wireless", "Landline", ...).
pub const LINE_TYPE_VALUE: Selector =
    Selector::XPath("//li[strong[contains(text(), 'Phone Line Type:')]]/span");

/// Carrier/operator name.
pub const COMPANY_VALUE: Selector =
    Selector::XPath("//li[strong[contains(text(), 'Phone Company:')]]/span");

/// Geographic description.
pub const LOCATION_VALUE: Selector =
    Selector::XPath("//li[strong[contains(text(), 'Phone Location:')]]/span");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_lead_with_the_stable_id() {
        assert_eq!(PHONE_INPUT_CHAIN[0], Selector::Id("GpofOvnvs"));
        assert_eq!(SEARCH_BUTTON_CHAIN[0], Selector::Id("CaptchaCheck"));
    }

    #[test]
    fn display_names_the_strategy() {
        assert_eq!(Selector::Id("x").to_string(), "id=x");
        assert_eq!(Selector::Class("phone-input").to_string(), "class=phone-input");
        assert_eq!(Selector::Tag("input").to_string(), "tag=input");
    }
}
