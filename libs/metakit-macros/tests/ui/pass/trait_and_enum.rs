// Traits extending traits, enums with annotated variants
use metakit::{metamethods, metatype, Element};

#[metatype(annotation)]
#[derive(Debug)]
pub struct Label(&'static str);

#[metatype(annotations = [Label("named")])]
pub trait Named {
    #[annotate(Label("name"))]
    fn name(&self) -> String;
}

#[metatype(extends = [Named])]
pub trait Shape: Named {
    fn area(&self) -> f64;
    fn scaled(&self, by: f64) -> Box<dyn Shape>;
}

#[metatype(interfaces = [Shape], annotations = [Label("kind")])]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    #[annotate(Label("round"))]
    Circle,
    Square,
}

#[metamethods]
impl Named for Kind {
    fn name(&self) -> String {
        format!("{self:?}")
    }
}

#[metamethods]
impl Shape for Kind {
    fn area(&self) -> f64 {
        match self {
            Kind::Circle => std::f64::consts::PI,
            Kind::Square => 1.0,
        }
    }

    fn scaled(&self, _by: f64) -> Box<dyn Shape> {
        Box::new(*self)
    }
}

fn main() {
    let mk = metakit::global().unwrap();
    let kind = mk.table().get_of::<Kind>().unwrap().clone();

    let walked: Vec<_> = mk
        .on_type(&kind)
        .traversing_interfaces()
        .types()
        .unwrap()
        .iter()
        .map(|t| t.key().short_name())
        .collect();
    assert_eq!(walked, vec!["Kind", "Shape", "Named"]);

    let circle = kind.declared_field("Circle").unwrap();
    let labels: Vec<_> = mk
        .on(Element::Field(circle))
        .falling_back_on_declaring_type()
        .find_all_of::<Label>()
        .unwrap()
        .map(|l| l.0)
        .collect();
    assert_eq!(labels, vec!["round", "kind"]);

    let name = mk.on_type(&kind).method("name", &[]).unwrap().unwrap();
    let inherited = mk
        .on(name)
        .traversing_overridden_members()
        .traversing_interfaces()
        .find::<Label>()
        .unwrap()
        .unwrap();
    assert_eq!(inherited.0, "name");
    assert_eq!(Kind::Circle.name(), "Circle");
    assert!(Kind::Square.scaled(2.0).area() > 0.0);
}
