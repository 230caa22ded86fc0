pub mod bed;
pub mod department;
pub mod enums;
pub mod journey;
pub mod patient;
pub mod vital_sign;

pub use bed::*;
pub use department::*;
pub use enums::*;
pub use journey::*;
pub use patient::*;
pub use vital_sign::*;
