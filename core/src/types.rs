//! Named and derived type descriptors. `spec.md` §4.3.
//!
//! The teacher's own design note (`spec.md` §9) flags that `TypeInfo`
//! instances are "sometimes freshly allocated per lookup and sometimes shared
//! via `TYPE_*_INFO` globals" in the original, and that a reimplementation
//! should canonicalise this. We do: [TypeInfo] is always handed out wrapped
//! in an [Rc], so cloning a descriptor is a pointer bump, not a deep copy.

use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use thiserror::Error;

/// A 4-bit code identifying a TGQ machine type. Matches the original
/// `tgpu_quartz_defs.h` enumeration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TgqType {
    I8,
    I16,
    I32,
    I64,
    Fp16,
    Fp32,
    Bf16,
    Bf32,
    V4I32,
    V4Fp16,
    V4Fp32,
    V4Bf16,
    V4Bf32,
}

impl TgqType {
    /// The 4-bit tag encoded into register bytes (`spec.md` §4.5/§6).
    pub fn tag(self) -> u8 {
        match self {
            Self::I8 => 0,
            Self::I16 => 1,
            Self::I32 => 2,
            Self::I64 => 3,
            Self::Fp16 => 4,
            Self::Fp32 => 5,
            Self::Bf16 => 6,
            Self::Bf32 => 7,
            Self::V4I32 => 8,
            Self::V4Fp16 => 9,
            Self::V4Fp32 => 10,
            Self::V4Bf16 => 11,
            Self::V4Bf32 => 12,
        }
    }
}

/// Which register file a value of a given [TgqType] lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegClass {
    Int,
    Float,
    Vector,
    /// Memory-resident: arrays, structs, samplers, functions.
    None,
}

/// Sampler variants recognised by the built-in type table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SamplerKind {
    Sampler2D,
    Sampler3D,
    SamplerCube,
}

/// The base kind partition used by the `is_*` predicates below.
#[derive(Clone, Debug)]
pub enum BaseKind {
    Void,
    Bool,
    Int,
    Float,
    Double,
    Char,
    Vec(u8),
    IVec(u8),
    BVec(u8),
    Mat(u8),
    Sampler(SamplerKind),
    Struct,
    Array,
    Function,
}

/// A field inside a [StructInfo], with its computed byte offset.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub type_info: Rc<TypeInfo>,
    pub offset: usize,
}

/// The resolved layout of a struct declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct StructInfo {
    pub name: String,
    pub fields: Vec<FieldInfo>,
    pub total_size: usize,
    pub alignment: usize,
}

/// An immutable type descriptor. See `spec.md` §3 for the field-by-field
/// description this mirrors exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeInfo {
    pub base: BaseKind,
    pub size: usize,
    pub alignment: usize,
    pub components: usize,
    pub tgq_type: Option<TgqType>,
    pub reg_class: RegClass,
    pub element_type: Option<Rc<TypeInfo>>,
    pub array_length: Option<usize>,
    pub struct_info: Option<Rc<StructInfo>>,
    pub return_type: Option<Rc<TypeInfo>>,
    pub param_types: Vec<Rc<TypeInfo>>,
}

impl TypeInfo {
    fn scalar(
        base: BaseKind,
        size: usize,
        tgq_type: Option<TgqType>,
        reg_class: RegClass,
    ) -> Self {
        Self {
            base,
            size,
            alignment: size.max(1),
            components: 1,
            tgq_type,
            reg_class,
            element_type: None,
            array_length: None,
            struct_info: None,
            return_type: None,
            param_types: Vec::new(),
        }
    }

    fn vector(base: BaseKind, n: u8, elem_size: usize, tgq_type: TgqType) -> Self {
        Self {
            base,
            size: elem_size * n as usize,
            alignment: elem_size,
            components: n as usize,
            tgq_type: Some(tgq_type),
            reg_class: RegClass::Vector,
            element_type: None,
            array_length: None,
            struct_info: None,
            return_type: None,
            param_types: Vec::new(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self.base,
            BaseKind::Bool | BaseKind::Int | BaseKind::Float | BaseKind::Double | BaseKind::Char
        )
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.base, BaseKind::Vec(_) | BaseKind::IVec(_) | BaseKind::BVec(_))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self.base, BaseKind::Mat(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.base,
            BaseKind::Int
                | BaseKind::Float
                | BaseKind::Double
                | BaseKind::Vec(_)
                | BaseKind::IVec(_)
                | BaseKind::Mat(_)
        )
    }

    /// Structural equality, except for structs, which compare by name
    /// (nominal typing) per `spec.md` §4.3.
    pub fn types_equal(&self, other: &TypeInfo) -> bool {
        match (&self.base, &other.base) {
            (BaseKind::Struct, BaseKind::Struct) => {
                match (&self.struct_info, &other.struct_info) {
                    (Some(a), Some(b)) => a.name == b.name,
                    _ => false,
                }
            }
            (BaseKind::Array, BaseKind::Array) => {
                self.array_length == other.array_length
                    && match (&self.element_type, &other.element_type) {
                        (Some(a), Some(b)) => a.types_equal(b),
                        _ => false,
                    }
            }
            _ => self.base == other.base,
        }
    }

    /// `types_equal`, plus the int<->float and bool<->int coercions
    /// `spec.md` §4.3 allows.
    pub fn types_compatible(&self, other: &TypeInfo) -> bool {
        if self.types_equal(other) {
            return true;
        }
        matches!(
            (&self.base, &other.base),
            (BaseKind::Int, BaseKind::Float)
                | (BaseKind::Float, BaseKind::Int)
                | (BaseKind::Bool, BaseKind::Int)
                | (BaseKind::Int, BaseKind::Bool)
        )
    }
}

// `BaseKind` needs a derived `PartialEq` that ignores the boxed payload
// details we don't compare structurally (Struct/Array handled above); for
// every other variant, simple derive-equality is exactly what we want.
impl PartialEq for BaseKind {
    fn eq(&self, other: &Self) -> bool {
        use BaseKind::*;
        match (self, other) {
            (Void, Void) | (Bool, Bool) | (Int, Int) | (Float, Float)
            | (Double, Double) | (Char, Char) | (Struct, Struct)
            | (Array, Array) | (Function, Function) => true,
            (Vec(a), Vec(b)) | (IVec(a), IVec(b)) | (BVec(a), BVec(b)) | (Mat(a), Mat(b)) => {
                a == b
            }
            (Sampler(a), Sampler(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum TypeError {
    #[error("unknown type name `{0}`")]
    UnknownType(&'static str),
    #[error("incompatible operand types for binary operator `{op}`")]
    IncompatibleOperands { op: &'static str },
    #[error("vector-vector operation requires matching component counts")]
    ComponentMismatch,
    #[error("swizzle character `{0}` out of range for this vector")]
    SwizzleOutOfRange(char),
    #[error("swizzle mixes incompatible component alphabets")]
    SwizzleAlphabetMismatch,
    #[error("no field named `{0}` on this struct")]
    NoSuchField(String),
    #[error("member access on a non-struct, non-vector type")]
    NotAccessible,
}

/// The fixed type table. `type_from_name` hands back a fresh `Rc` each call
/// (consumers never mutate through it, so sharing the allocation is safe and
/// free, unlike the teacher-language original).
pub struct TypeRegistry;

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry
    }

    /// Resolve a built-in type name. Returns `None` for struct/array names,
    /// which callers resolve through the symbol table instead.
    pub fn type_from_name(&self, name: &str) -> Option<Rc<TypeInfo>> {
        let info = match name {
            "void" => TypeInfo::scalar(BaseKind::Void, 0, None, RegClass::None),
            "bool" => TypeInfo::scalar(BaseKind::Bool, 1, Some(TgqType::I8), RegClass::Int),
            "int" => TypeInfo::scalar(BaseKind::Int, 4, Some(TgqType::I32), RegClass::Int),
            "float" => TypeInfo::scalar(BaseKind::Float, 4, Some(TgqType::Fp32), RegClass::Float),
            "double" => TypeInfo::scalar(BaseKind::Double, 8, Some(TgqType::I64), RegClass::Float),
            "char" => TypeInfo::scalar(BaseKind::Char, 1, Some(TgqType::I8), RegClass::Int),
            "vec2" => TypeInfo::vector(BaseKind::Vec(2), 2, 4, TgqType::Fp32),
            "vec3" => TypeInfo::vector(BaseKind::Vec(3), 3, 4, TgqType::Fp32),
            "vec4" => TypeInfo::vector(BaseKind::Vec(4), 4, 4, TgqType::V4Fp32),
            "ivec2" => TypeInfo::vector(BaseKind::IVec(2), 2, 4, TgqType::I32),
            "ivec3" => TypeInfo::vector(BaseKind::IVec(3), 3, 4, TgqType::I32),
            "ivec4" => TypeInfo::vector(BaseKind::IVec(4), 4, 4, TgqType::V4I32),
            "bvec2" => TypeInfo::vector(BaseKind::BVec(2), 2, 1, TgqType::I8),
            "bvec3" => TypeInfo::vector(BaseKind::BVec(3), 3, 1, TgqType::I8),
            "bvec4" => TypeInfo::vector(BaseKind::BVec(4), 4, 1, TgqType::I8),
            "mat2" => matrix_type(2),
            "mat3" => matrix_type(3),
            "mat4" => matrix_type(4),
            "sampler2D" => sampler_type(SamplerKind::Sampler2D),
            "sampler3D" => sampler_type(SamplerKind::Sampler3D),
            "samplerCube" => sampler_type(SamplerKind::SamplerCube),
            _ => return None,
        };
        Some(Rc::new(info))
    }

    /// Construct an array type from an element type and a fixed length.
    /// `spec.md` §4.3: "size is element.size * length, alignment equals the
    /// element's, register class is none".
    pub fn array_of(&self, element: Rc<TypeInfo>, length: usize) -> Rc<TypeInfo> {
        Rc::new(TypeInfo {
            base: BaseKind::Array,
            size: element.size * length,
            alignment: element.alignment,
            components: length,
            tgq_type: None,
            reg_class: RegClass::None,
            element_type: Some(element),
            array_length: Some(length),
            struct_info: None,
            return_type: None,
            param_types: Vec::new(),
        })
    }

    /// Construct a struct type from a named ordered field list, computing
    /// each field's offset by aligning the running cursor up to the field's
    /// alignment. `spec.md` §4.3/§3 invariant: `total_size` is the running
    /// aligned offset after the last field, rounded up to the struct's own
    /// alignment.
    pub fn struct_of(
        &self,
        name: String,
        fields: Vec<(String, Rc<TypeInfo>)>,
    ) -> Rc<TypeInfo> {
        let mut offset = 0usize;
        let mut alignment = 1usize;
        let mut field_infos = Vec::with_capacity(fields.len());
        for (field_name, field_type) in fields {
            offset = align_up(offset, field_type.alignment);
            alignment = alignment.max(field_type.alignment);
            field_infos.push(FieldInfo {
                name: field_name,
                offset,
                type_info: Rc::clone(&field_type),
            });
            offset += field_type.size;
        }
        let total_size = align_up(offset, alignment);
        let struct_info = Rc::new(StructInfo {
            name: name.clone(),
            fields: field_infos,
            total_size,
            alignment,
        });
        Rc::new(TypeInfo {
            base: BaseKind::Struct,
            size: total_size,
            alignment,
            components: struct_info.fields.len(),
            tgq_type: None,
            reg_class: RegClass::None,
            element_type: None,
            array_length: None,
            struct_info: Some(struct_info),
            return_type: None,
            param_types: Vec::new(),
        })
    }

    /// Construct a function type from a return type and ordered parameter
    /// types.
    pub fn function_of(
        &self,
        return_type: Rc<TypeInfo>,
        param_types: Vec<Rc<TypeInfo>>,
    ) -> Rc<TypeInfo> {
        Rc::new(TypeInfo {
            base: BaseKind::Function,
            size: 0,
            alignment: 1,
            components: 0,
            tgq_type: None,
            reg_class: RegClass::None,
            element_type: None,
            array_length: None,
            struct_info: None,
            return_type: Some(return_type),
            param_types,
        })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn align_up(offset: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return offset;
    }
    (offset + alignment - 1) / alignment * alignment
}

fn matrix_type(n: u8) -> TypeInfo {
    TypeInfo {
        base: BaseKind::Mat(n),
        size: 4 * (n as usize) * (n as usize),
        alignment: 4,
        components: (n as usize) * (n as usize),
        tgq_type: Some(TgqType::Fp32),
        reg_class: RegClass::None,
        element_type: None,
        array_length: None,
        struct_info: None,
        return_type: None,
        param_types: Vec::new(),
    }
}

fn sampler_type(kind: SamplerKind) -> TypeInfo {
    TypeInfo {
        base: BaseKind::Sampler(kind),
        size: 8,
        alignment: 8,
        components: 1,
        tgq_type: None,
        reg_class: RegClass::None,
        element_type: None,
        array_length: None,
        struct_info: None,
        return_type: None,
        param_types: Vec::new(),
    }
}

/// Infer the result type of a binary operator. `spec.md` §4.3 "Binary
/// result".
pub fn binary_result(
    op: &str,
    left: &Rc<TypeInfo>,
    right: &Rc<TypeInfo>,
    registry: &TypeRegistry,
) -> Result<Rc<TypeInfo>, TypeError> {
    match op {
        "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => {
            Ok(registry.type_from_name("bool").unwrap())
        }
        _ => {
            if left.is_matrix() && right.is_matrix() {
                Ok(Rc::clone(left))
            } else if left.is_matrix() && right.is_vector() {
                matching_vec_for_matrix(left, right, registry)
            } else if left.is_vector() && right.is_vector() {
                if left.components != right.components {
                    return Err(TypeError::ComponentMismatch);
                }
                Ok(Rc::clone(left))
            } else if left.is_vector() && right.is_scalar() {
                Ok(Rc::clone(left))
            } else if right.is_vector() && left.is_scalar() {
                Ok(Rc::clone(right))
            } else if left.is_scalar() && right.is_scalar() {
                let is_float = matches!(left.base, BaseKind::Float | BaseKind::Double)
                    || matches!(right.base, BaseKind::Float | BaseKind::Double);
                Ok(registry
                    .type_from_name(if is_float { "float" } else { "int" })
                    .unwrap())
            } else {
                Err(TypeError::IncompatibleOperands { op: op_static(op) })
            }
        }
    }
}

fn matching_vec_for_matrix(
    matrix: &Rc<TypeInfo>,
    vector: &Rc<TypeInfo>,
    _registry: &TypeRegistry,
) -> Result<Rc<TypeInfo>, TypeError> {
    if let BaseKind::Mat(n) = matrix.base {
        if vector.components == n as usize {
            return Ok(Rc::clone(vector));
        }
    }
    Err(TypeError::ComponentMismatch)
}

fn op_static(op: &str) -> &'static str {
    match op {
        "+" => "+",
        "-" => "-",
        "*" => "*",
        "/" => "/",
        "%" => "%",
        _ => "?",
    }
}

/// Infer the result type of a unary operator. `spec.md` §4.3 "Unary result".
pub fn unary_result(
    op: &str,
    operand: &Rc<TypeInfo>,
    registry: &TypeRegistry,
) -> Rc<TypeInfo> {
    if op == "!" {
        registry.type_from_name("bool").unwrap()
    } else {
        Rc::clone(operand)
    }
}

/// Which letter alphabet a swizzle character belongs to, and its component
/// index. `xyzw`, `rgba`, `stpq` are interchangeable per `spec.md` §4.3.
fn swizzle_index(c: char) -> Option<usize> {
    match c {
        'x' | 'r' | 's' => Some(0),
        'y' | 'g' | 't' => Some(1),
        'z' | 'b' | 'p' => Some(2),
        'w' | 'a' | 'q' => Some(3),
        _ => None,
    }
}

/// Resolve the result type of a swizzle access on a vector. Length of the
/// swizzle determines the result arity (1 -> scalar, 2/3/4 -> vecN), and the
/// source vector's own family (float/int/bool) is preserved.
pub fn swizzle_result(
    source: &Rc<TypeInfo>,
    swizzle: &str,
    registry: &TypeRegistry,
) -> Result<Rc<TypeInfo>, TypeError> {
    for c in swizzle.chars() {
        let idx = swizzle_index(c).ok_or(TypeError::SwizzleOutOfRange(c))?;
        if idx >= source.components {
            return Err(TypeError::SwizzleOutOfRange(c));
        }
    }
    let family = match source.base {
        BaseKind::Vec(_) => "",
        BaseKind::IVec(_) => "i",
        BaseKind::BVec(_) => "b",
        _ => return Err(TypeError::NotAccessible),
    };
    let name: String = match swizzle.len() {
        1 => match family {
            "" => "float".to_string(),
            "i" => "int".to_string(),
            "b" => "bool".to_string(),
            _ => unreachable!(),
        },
        n @ 2..=4 => format!("{}vec{}", family, n),
        _ => return Err(TypeError::SwizzleAlphabetMismatch),
    };
    Ok(registry.type_from_name(&name).unwrap())
}

/// Resolve the result type of `.field` access on a struct.
pub fn member_result(
    source: &Rc<TypeInfo>,
    field_name: &str,
) -> Result<Rc<TypeInfo>, TypeError> {
    let struct_info = source
        .struct_info
        .as_ref()
        .ok_or(TypeError::NotAccessible)?;
    struct_info
        .fields
        .iter()
        .find(|f| f.name == field_name)
        .map(|f| Rc::clone(&f.type_info))
        .ok_or_else(|| TypeError::NoSuchField(field_name.to_string()))
}

/// Convert an IEEE-754 binary32 value to a binary16 bit pattern.
/// `spec.md` §4.3 "Half-precision conversion".
pub fn float32_to_fp16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32 - 127 + 15;
    let mantissa = ((bits >> 13) & 0x3ff) as u16;

    if exp <= 0 {
        // Subnormal (or zero): collapses to signed zero.
        sign
    } else if exp >= 31 {
        // Overflow: signed infinity.
        sign | 0x7c00
    } else {
        sign | ((exp as u16) << 10) | mantissa
    }
}

impl Display for TgqType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_lookup() {
        let reg = TypeRegistry::new();
        let int_t = reg.type_from_name("int").unwrap();
        assert_eq!(int_t.size, 4);
        assert_eq!(int_t.tgq_type, Some(TgqType::I32));
    }

    #[test]
    fn test_unknown_type() {
        let reg = TypeRegistry::new();
        assert!(reg.type_from_name("Widget").is_none());
    }

    #[test]
    fn test_array_layout() {
        let reg = TypeRegistry::new();
        let int_t = reg.type_from_name("int").unwrap();
        let arr = reg.array_of(int_t, 10);
        assert_eq!(arr.size, 40);
        assert_eq!(arr.alignment, 4);
        assert_eq!(arr.reg_class, RegClass::None);
    }

    #[test]
    fn test_struct_layout_offsets() {
        // struct S { int a; float b; } -> a@0, b@4, size 8, alignment 4
        let reg = TypeRegistry::new();
        let int_t = reg.type_from_name("int").unwrap();
        let float_t = reg.type_from_name("float").unwrap();
        let s = reg.struct_of(
            "S".into(),
            vec![("a".into(), int_t), ("b".into(), float_t)],
        );
        let info = s.struct_info.as_ref().unwrap();
        assert_eq!(info.fields[0].offset, 0);
        assert_eq!(info.fields[1].offset, 4);
        assert_eq!(info.total_size, 8);
        assert_eq!(info.alignment, 4);
    }

    #[test]
    fn test_struct_alignment_padding() {
        // struct { char c; int i; } -> c@0, i@4 (padded), size 8
        let reg = TypeRegistry::new();
        let char_t = reg.type_from_name("char").unwrap();
        let int_t = reg.type_from_name("int").unwrap();
        let s = reg.struct_of(
            "Padded".into(),
            vec![("c".into(), char_t), ("i".into(), int_t)],
        );
        let info = s.struct_info.as_ref().unwrap();
        assert_eq!(info.fields[0].offset, 0);
        assert_eq!(info.fields[1].offset, 4);
        assert_eq!(info.total_size, 8);
    }

    #[test]
    fn test_binary_result_comparison_is_bool() {
        let reg = TypeRegistry::new();
        let int_t = reg.type_from_name("int").unwrap();
        let result = binary_result("<", &int_t, &int_t, &reg).unwrap();
        assert_eq!(result.base, BaseKind::Bool);
    }

    #[test]
    fn test_binary_result_float_dominance() {
        let reg = TypeRegistry::new();
        let int_t = reg.type_from_name("int").unwrap();
        let float_t = reg.type_from_name("float").unwrap();
        let result = binary_result("+", &int_t, &float_t, &reg).unwrap();
        assert_eq!(result.base, BaseKind::Float);
    }

    #[test]
    fn test_binary_result_matrix_vector() {
        let reg = TypeRegistry::new();
        let mat4 = reg.type_from_name("mat4").unwrap();
        let vec4 = reg.type_from_name("vec4").unwrap();
        let result = binary_result("*", &mat4, &vec4, &reg).unwrap();
        assert_eq!(result.base, BaseKind::Vec(4));
    }

    #[test]
    fn test_binary_result_vector_mismatch() {
        let reg = TypeRegistry::new();
        let vec3 = reg.type_from_name("vec3").unwrap();
        let vec4 = reg.type_from_name("vec4").unwrap();
        assert!(binary_result("+", &vec3, &vec4, &reg).is_err());
    }

    #[test]
    fn test_swizzle_result_lengths() {
        let reg = TypeRegistry::new();
        let vec4 = reg.type_from_name("vec4").unwrap();
        assert_eq!(swizzle_result(&vec4, "x", &reg).unwrap().base, BaseKind::Float);
        assert_eq!(
            swizzle_result(&vec4, "xy", &reg).unwrap().base,
            BaseKind::Vec(2)
        );
        assert_eq!(
            swizzle_result(&vec4, "rgba", &reg).unwrap().base,
            BaseKind::Vec(4)
        );
    }

    #[test]
    fn test_swizzle_out_of_range() {
        let reg = TypeRegistry::new();
        let vec2 = reg.type_from_name("vec2").unwrap();
        assert!(swizzle_result(&vec2, "z", &reg).is_err());
    }

    #[test]
    fn test_fp16_subnormal_to_zero() {
        assert_eq!(float32_to_fp16(1.0e-10), 0);
        assert_eq!(float32_to_fp16(-1.0e-10), 0x8000);
    }

    #[test]
    fn test_fp16_overflow_to_infinity() {
        assert_eq!(float32_to_fp16(1.0e10), 0x7c00);
        assert_eq!(float32_to_fp16(-1.0e10), 0xfc00);
    }

    #[test]
    fn test_fp16_normal_roundtrip_ballpark() {
        // 1.0f32 -> fp16 1.0 is sign=0, exp=15 (rebiased), mantissa=0
        assert_eq!(float32_to_fp16(1.0), 0x3c00);
    }
}
