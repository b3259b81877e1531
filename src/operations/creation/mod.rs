mod make_box;
mod make_compound;
mod make_edge;
mod make_polygon;
mod make_sphere;

pub use make_box::MakeBox;
pub use make_compound::MakeCompound;
pub use make_edge::{MakeCircleEdge, MakeEdge};
pub use make_polygon::MakePolygon;
pub use make_sphere::MakeSphere;
