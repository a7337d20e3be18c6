//! Compiled regexes for duration lexical forms.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `[-]PnDTnHnMn.nS` with every field optional.
    pub(crate) static ref DAY_TIME_DURATION: Regex = Regex::new(
        r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d+))?S)?)?$"
    )
    .unwrap();

    /// `[-]PnYnM` with every field optional.
    pub(crate) static ref YEAR_MONTH_DURATION: Regex =
        Regex::new(r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?$").unwrap();
}
