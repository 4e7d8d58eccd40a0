pub mod html;
pub mod in_flight;
pub mod js;
pub mod path_resolver;

pub use html::{MarkupParse, MarkupParser};
pub use in_flight::{InFlight, InFlightGuard};
pub use js::{ScriptParse, ScriptParser};
pub use path_resolver::PathResolver;
