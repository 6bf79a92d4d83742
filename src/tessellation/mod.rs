mod quadrangulate;
mod triangulate_face;

pub use quadrangulate::quadrangulate;
pub use triangulate_face::{point_in_area, triangulate_face};
