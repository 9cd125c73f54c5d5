// Annotation types annotated with other annotations, restricted by Target
use metakit::lang::Target;
use metakit::{metamethods, metatype, ElementKind};

#[metatype(annotation)]
#[derive(Debug)]
pub struct Component;

#[metatype(annotation, annotations = [Component, Target(&[ElementKind::Type])])]
#[derive(Debug)]
pub struct Service(pub &'static str);

#[metatype(annotation, annotations = [Target(&[ElementKind::Method, ElementKind::Constructor])])]
#[derive(Debug)]
pub struct Transactional;

#[metatype(annotations = [Service("billing")])]
pub struct Billing;

#[metamethods]
impl Billing {
    #[annotate(Transactional)]
    pub fn charge(&self, _cents: u64) {}
}

fn main() {
    let mk = metakit::global().unwrap();
    let billing = mk.table().get_of::<Billing>().unwrap().clone();

    let plain = mk.on(billing.clone()).find_all().unwrap();
    assert_eq!(plain.len(), 1);

    let meta = mk.on(billing).including_meta_annotations().find_all().unwrap();
    assert_eq!(meta.len(), 2);
    assert!(meta.as_slice()[0].is::<Service>());
    assert!(meta.as_slice()[1].is::<Component>());

    let charge = mk.on_type_of::<Billing>().unwrap().method("charge", &[metakit::TypeKey::of::<u64>()]).unwrap().unwrap();
    assert!(mk.on(charge).find::<Transactional>().unwrap().is_some());
    Billing.charge(1);
}
