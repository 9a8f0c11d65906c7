//! Report generation port trait.

use crate::domain::error::AtfError;
use crate::domain::metrics::Summary;
use crate::domain::simulator::SimulationResult;
use std::path::Path;

/// Port for writing simulation reports.
pub trait ReportPort {
    fn write(
        &self,
        result: &SimulationResult,
        summary: &Summary,
        output_dir: &Path,
    ) -> Result<(), AtfError>;
}
