pub mod json;
pub mod terminal;

use crate::types::ScanReport;

pub trait Reporter {
    fn report(&self, report: &ScanReport) -> String;
}
