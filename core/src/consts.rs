//! Fixed tables that the lexer and type registry key off of.

/// Keywords that the lexer classifies identifiers against.
pub const KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "return", "break", "continue",
    "const", "struct", "uniform", "varying", "attribute", "in", "out",
    "inout", "precision", "mediump", "highp", "lowp",
];

/// Built-in type names the lexer classifies identifiers against.
pub const BUILTIN_TYPES: &[&str] = &[
    "void", "int", "float", "double", "bool", "char", "vec2", "vec3", "vec4",
    "ivec2", "ivec3", "ivec4", "bvec2", "bvec3", "bvec4", "mat2", "mat3",
    "mat4", "sampler2D", "sampler3D", "samplerCube",
];

/// Two-character operators the lexer greedily accepts.
pub const TWO_CHAR_OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "++", "--",
    "<<", ">>",
];

/// Bucket count for each [Scope](crate::symtab::Scope)'s hash table.
pub const SCOPE_BUCKET_COUNT: usize = 64;

/// Capacity the [EmitBuffer](crate::emit::EmitBuffer) starts at before its
/// first doubling.
pub const EMIT_BUFFER_INITIAL_CAPACITY: usize = 1024;

/// Upper bound on live labels in a [LabelManager](crate::label::LabelManager).
pub const MAX_LABELS: usize = 256;

/// Upper bound on live relocations in a [LabelManager](crate::label::LabelManager).
pub const MAX_RELOCATIONS: usize = 512;
