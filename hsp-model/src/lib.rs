pub mod declaration;
pub mod error;
pub mod path;
pub mod tree;

pub use declaration::{MappingDeclaration, RetrievalMode, TransformationDeclaration};
pub use error::{ModelError, Result};
pub use path::AttributePath;
pub use tree::{AttributeValue, Curve, CurveLookup, ModelTree};
