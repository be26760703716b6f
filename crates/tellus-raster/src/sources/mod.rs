//! Concrete raster sources: BIL16 elevation and slippy-map imagery.

mod bil;
mod imagery;

pub use bil::BilElevationSource;
pub use imagery::WebImagerySource;
