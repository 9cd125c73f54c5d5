use std::sync::{Arc, Barrier};

use metakit::{metamethods, metatype, Annotations, IntrospectorConfig, MetaError, TypeKey};

#[metatype(annotation)]
#[derive(Debug, PartialEq)]
pub struct Tag(pub &'static str);

#[metatype(annotation)]
#[derive(Debug)]
pub struct Inherited;

#[metatype(annotation, annotations = [Inherited])]
#[derive(Debug)]
pub struct Audited;

pub mod internal {
    use metakit::metatype;

    #[metatype(annotation)]
    #[derive(Debug)]
    pub struct Hidden;
}

#[metatype]
pub trait Base {
    #[annotate(Tag("base-run"))]
    fn run(&self);
}

#[metatype(
    interfaces = [Base],
    annotations = [Tag("impl"), Audited, internal::Hidden, std::time::Duration::from_secs(1)]
)]
pub struct Impl {
    counter: u32,
    #[annotate(Tag("labelled"))]
    label: String,
}

#[metamethods]
impl Base for Impl {
    fn run(&self) {}
}

#[metatype(interfaces = [Base])]
pub struct Other;

#[metamethods]
impl Base for Other {
    #[annotate(Tag("other-run"), Audited)]
    fn run(&self) {}
}

fn tags(a: &Annotations) -> Vec<&'static str> {
    a.of_type::<Tag>().map(|t| t.0).collect()
}

fn impl_run() -> metakit::MethodRef {
    metakit::global()
        .unwrap()
        .on_type_of::<Impl>()
        .unwrap()
        .method("run", &[])
        .unwrap()
        .unwrap()
}

#[test]
fn overridden_interface_method_carries_the_annotation() {
    let mk = metakit::global().unwrap();

    let direct = mk.on(impl_run()).find_all().unwrap();
    assert!(direct.is_empty());

    let traversed = mk
        .on(impl_run())
        .traversing_overridden_members()
        .traversing_interfaces()
        .find_all()
        .unwrap();
    assert_eq!(tags(&traversed), vec!["base-run"]);
    assert_eq!(traversed.len(), 1);
}

#[test]
fn overridden_members_without_type_traversal_find_nothing() {
    let mk = metakit::global().unwrap();
    let found = mk
        .on(impl_run())
        .traversing_overridden_members()
        .find::<Tag>()
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn field_falls_back_on_its_declaring_type() {
    let mk = metakit::global().unwrap();
    let counter = mk.on_type_of::<Impl>().unwrap().field("counter").unwrap().unwrap();

    assert!(mk.on(counter.clone()).find::<Tag>().unwrap().is_none());
    let found = mk
        .on(counter)
        .falling_back_on_declaring_type()
        .find::<Tag>()
        .unwrap();
    assert_eq!(found.as_deref(), Some(&Tag("impl")));

    let label = mk.on_type_of::<Impl>().unwrap().field("label").unwrap().unwrap();
    let all = mk.on(label).falling_back_on_declaring_type().find_all().unwrap();
    assert_eq!(tags(&all), vec!["labelled", "impl"]);
}

#[test]
fn meta_annotation_follows_the_annotation_it_decorates() {
    let mk = metakit::global().unwrap();
    let other_run = mk
        .on_type_of::<Other>()
        .unwrap()
        .method("run", &[])
        .unwrap()
        .unwrap();

    let plain = mk.on(other_run.clone()).find_all().unwrap();
    assert!(plain.first_of::<Inherited>().is_none());

    let meta = mk.on(other_run).including_meta_annotations().find_all().unwrap();
    let kinds: Vec<_> = meta.iter().map(|a| a.annotation_type().short_name()).collect();
    assert_eq!(kinds, vec!["Tag", "Audited", "Inherited"]);
}

#[test]
fn reserved_namespaces_never_show_up() {
    let mk = metakit::global().unwrap();
    let ty = mk.table().get_of::<Impl>().unwrap().clone();

    let all = mk.on(ty.clone()).including_meta_annotations().find_all().unwrap();
    assert!(all
        .iter()
        .all(|a| !a.annotation_type().is_in_namespace("core::")));
    assert!(all.iter().any(|a| a.is::<internal::Hidden>()));

    let config = IntrospectorConfig {
        reserved_namespaces: vec!["core::".into(), "annotations::internal::".into()],
    };
    let custom = metakit::Introspector::with_config(
        metakit::TypeTable::discover_and_build().unwrap(),
        config,
    );
    let ty = custom.table().get_of::<Impl>().unwrap().clone();
    let all = custom.on(ty).find_all().unwrap();
    let kinds: Vec<_> = all.iter().map(|a| a.annotation_type().short_name()).collect();
    assert_eq!(kinds, vec!["Tag", "Audited"]);
}

#[test]
fn find_equals_first_match_of_find_all() {
    let mk = metakit::global().unwrap();
    let label = mk.on_type_of::<Impl>().unwrap().field("label").unwrap().unwrap();
    let q = mk
        .on(label)
        .falling_back_on_declaring_type()
        .including_meta_annotations();

    let first = q
        .find_all()
        .unwrap()
        .iter()
        .find(|a| a.is::<Tag>())
        .and_then(|a| a.downcast::<Tag>());
    assert_eq!(q.find::<Tag>().unwrap(), first);
    assert_eq!(
        q.find_by_key(TypeKey::of::<Inherited>()).unwrap().map(|a| a.annotation_type()),
        Some(TypeKey::of::<Inherited>())
    );
}

#[test]
fn equal_queries_share_one_cached_sequence() {
    let mk = metakit::global().unwrap();
    let a = mk
        .on(impl_run())
        .traversing_overridden_members()
        .traversing_interfaces()
        .find_all()
        .unwrap();
    let b = mk
        .on(impl_run())
        .traversing_interfaces()
        .traversing_overridden_members()
        .find_all()
        .unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(a, b);
}

#[test]
fn concurrent_callers_observe_the_same_sequence() {
    const THREADS: usize = 8;
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let mk = metakit::global().unwrap();
                let other = mk.table().get_of::<Other>().unwrap().clone();
                barrier.wait();
                mk.on(other)
                    .traversing_interfaces()
                    .including_meta_annotations()
                    .find_all()
                    .unwrap()
            })
        })
        .collect();
    let results: Vec<Annotations> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for r in &results {
        assert!(r.ptr_eq(&results[0]));
    }
}

#[test]
fn invalid_combinations_fail_fast() {
    let mk = metakit::global().unwrap();
    let ty = mk.table().get_of::<Impl>().unwrap().clone();
    let counter = mk.on_type_of::<Impl>().unwrap().field("counter").unwrap().unwrap();

    let err = mk.on(counter).traversing_overridden_members().find_all().unwrap_err();
    assert!(matches!(err, MetaError::InvalidArgument(_)));
    let err = mk.on(ty).falling_back_on_declaring_type().find::<Tag>().unwrap_err();
    assert!(matches!(err, MetaError::InvalidArgument(_)));
    assert!(matches!(
        metakit::init(IntrospectorConfig::default()),
        Err(MetaError::AlreadyInitialized)
    ));
}
