pub mod decision;
pub mod input;
pub mod measurement;
pub mod phenotype;
pub mod result;
pub mod source;

pub use decision::Decision;
pub use input::{ClassificationInput, Designator, SpecimenRef};
pub use measurement::{Measurement, MeasuredValue, MethodKind, ScreenResult, ValueComparator};
pub use phenotype::{CarbapenemaseType, PhenotypeFlag};
pub use result::ClassificationResult;
pub use source::BreakpointSource;
