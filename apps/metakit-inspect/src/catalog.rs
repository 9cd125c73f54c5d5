//! Built-in demo catalog: a small persistence layer described with the macros.

// Only ever inspected, never driven.
#![allow(dead_code)]

use metakit::lang::Target;
use metakit::{metamethods, metatype, ElementKind};

#[metatype(annotation)]
#[derive(Debug)]
pub struct Stereotype;

#[metatype(annotation, annotations = [Stereotype])]
#[derive(Debug)]
pub struct Entity(pub &'static str);

#[metatype(annotation)]
#[derive(Debug)]
pub struct Column(pub &'static str);

#[metatype(annotation, annotations = [Stereotype, Target(&[ElementKind::Method])])]
#[derive(Debug)]
pub struct Transactional {
    pub read_only: bool,
}

#[metatype(annotation)]
#[derive(Debug)]
pub struct Audited;

#[metatype(annotations = [Audited])]
pub trait Auditable {
    #[annotate(Audited)]
    fn last_modified_by(&self) -> Option<String>;
}

#[metatype(extends = [Auditable])]
pub trait Repository: Auditable {
    #[annotate(Transactional { read_only: true })]
    fn count(&self) -> usize;

    #[annotate(Transactional { read_only: false })]
    fn save(&mut self, user: User);
}

#[metatype(annotations = [Entity("users")], default)]
#[derive(Debug, Default, Clone)]
pub struct User {
    #[annotate(Column("id"))]
    pub id: u64,
    #[annotate(Column("login"))]
    pub login: String,
}

#[metatype]
#[derive(Debug, Clone, Copy)]
pub enum Role {
    Admin,
    #[annotate(Column("member"))]
    Member,
}

#[metatype(default)]
#[derive(Default)]
pub struct BaseRepository {
    modified_by: Option<String>,
}

#[metamethods]
impl Auditable for BaseRepository {
    fn last_modified_by(&self) -> Option<String> {
        self.modified_by.clone()
    }
}

#[metatype(superclass = BaseRepository, interfaces = [Repository])]
#[derive(Default)]
pub struct UserRepository {
    base: BaseRepository,
    users: Vec<User>,
}

#[metamethods]
impl UserRepository {
    #[constructor]
    pub fn new() -> Self {
        Self::default()
    }

    #[constructor]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            base: BaseRepository::default(),
            users: Vec::with_capacity(capacity),
        }
    }
}

#[metamethods]
impl Auditable for UserRepository {
    fn last_modified_by(&self) -> Option<String> {
        self.base.last_modified_by()
    }
}

#[metamethods]
impl Repository for UserRepository {
    fn count(&self) -> usize {
        self.users.len()
    }

    #[annotate(Column("users"))]
    fn save(&mut self, user: User) {
        self.users.push(user);
    }
}
