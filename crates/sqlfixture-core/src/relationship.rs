//! Relationship metadata.
//!
//! A relationship field holds model instances instead of a literal. It is the
//! only kind of field a bare string can reference from a fixture. The loader
//! learns which fields are relationships from this metadata, so nothing is
//! inferred from the value being assigned.

/// The cardinality of a relationship, seen from the declaring model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// One-to-one: a `User` has one `Profile`.
    OneToOne,
    /// Many-to-one: many `Profile`s belong to one `User`.
    #[default]
    ManyToOne,
    /// One-to-many: one `User` has many `Post`s.
    OneToMany,
    /// Many-to-many: `Profile`s have many `Group`s.
    ManyToMany,
}

impl RelationshipKind {
    /// Whether the field holds a list of instances.
    #[must_use]
    pub const fn is_to_many(&self) -> bool {
        matches!(self, RelationshipKind::OneToMany | RelationshipKind::ManyToMany)
    }
}

/// Metadata about a relationship between models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the relationship field.
    pub name: String,

    /// Name of the related model.
    pub target: String,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Local foreign key column filled from the target's primary key on flush
    /// (to-one relationships only), e.g. `"user_id"` on `Profile`.
    pub local_key: Option<String>,

    /// The relationship field on the target model that points back.
    pub back_populates: Option<String>,
}

impl RelationshipInfo {
    /// Create a new relationship with required fields.
    pub fn new(name: impl Into<String>, target: impl Into<String>, kind: RelationshipKind) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind,
            local_key: None,
            back_populates: None,
        }
    }

    /// Shorthand for a many-to-one relationship.
    pub fn many_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationshipKind::ManyToOne)
    }

    /// Shorthand for a one-to-one relationship.
    pub fn one_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationshipKind::OneToOne)
    }

    /// Shorthand for a one-to-many relationship.
    pub fn one_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationshipKind::OneToMany)
    }

    /// Shorthand for a many-to-many relationship.
    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationshipKind::ManyToMany)
    }

    /// Set the local foreign key column.
    #[must_use]
    pub fn local_key(mut self, column: impl Into<String>) -> Self {
        self.local_key = Some(column.into());
        self
    }

    /// Set the back-populates field name (bidirectional relationships).
    #[must_use]
    pub fn back_populates(mut self, field: impl Into<String>) -> Self {
        self.back_populates = Some(field.into());
        self
    }

    /// Whether the field holds a list of instances.
    pub fn is_to_many(&self) -> bool {
        self.kind.is_to_many()
    }
}
