// Struct with fields, supertypes and an impl block with a constructor
use metakit::{metamethods, metatype, TypeKey};

#[metatype(annotation)]
#[derive(Debug)]
pub struct Column(&'static str);

#[metatype]
pub trait Entity {
    fn id(&self) -> u64;
}

#[metatype(default)]
#[derive(Default)]
pub struct BaseEntity {
    #[annotate(Column("id"))]
    id: u64,
}

#[metatype(superclass = BaseEntity, interfaces = [Entity])]
pub struct User {
    #[annotate(Column("name"))]
    name: String,
    #[synthetic]
    cache: Option<Vec<u8>>,
    base: BaseEntity,
}

#[metamethods]
impl User {
    #[constructor]
    pub fn new(name: &str) -> Self {
        User {
            name: name.to_string(),
            cache: None,
            base: BaseEntity::default(),
        }
    }

    pub fn rename(&mut self, to: &str) -> &mut Self {
        self.name = to.to_string();
        self
    }
}

#[metamethods]
impl Entity for User {
    fn id(&self) -> u64 {
        self.base.id
    }
}

fn main() {
    let mk = metakit::global().unwrap();
    let user = mk.on_type_of::<User>().unwrap().traversing_superclasses();

    let fields: Vec<_> = user.fields().unwrap().iter().map(|f| f.name()).collect();
    assert_eq!(fields, vec!["name", "base", "id"]);

    assert!(user.constructor("new", &[TypeKey::of::<&str>()]).unwrap().is_some());
    let rename = user.method("rename", &[TypeKey::of::<&str>()]).unwrap().unwrap();
    assert_eq!(rename.return_type(), TypeKey::of::<&'static mut User>());
    assert!(user.method("id", &[]).unwrap().is_some());

    let id = user.field("id").unwrap().unwrap();
    let column = mk.on(id).find::<Column>().unwrap().unwrap();
    assert_eq!(column.0, "id");

    assert!(mk.instantiate_default_of::<BaseEntity>().is_ok());
    let _ = User::new("x").rename("y").id();
}
