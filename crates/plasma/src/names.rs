//! Well-known symbol and type names.
//!
//! Operator instructions, the iterator protocol, and the seeded master
//! symbols all resolve attributes by name; the constants here are the
//! single source of truth for those spellings.

// Attribute protocol.
pub const SELF: &str = "Self";
pub const INITIALIZE: &str = "Initialize";
pub const TO_STRING: &str = "ToString";
pub const BOOL: &str = "Bool";
pub const ITER: &str = "Iter";
pub const HAS_NEXT: &str = "HasNext";
pub const NEXT: &str = "Next";
pub const INDEX: &str = "Index";
pub const ASSIGN: &str = "Assign";
pub const OPERATION: &str = "Operation";

// Unary operators.
pub const NEG_BITS: &str = "NegBits";
pub const NEGATE: &str = "Negate";
pub const NEGATIVE: &str = "Negative";

// Binary operators, left-hand and right-hand spellings.
pub const ADD: &str = "Add";
pub const RIGHT_ADD: &str = "RightAdd";
pub const SUB: &str = "Sub";
pub const RIGHT_SUB: &str = "RightSub";
pub const MUL: &str = "Mul";
pub const RIGHT_MUL: &str = "RightMul";
pub const DIV: &str = "Div";
pub const RIGHT_DIV: &str = "RightDiv";
pub const FLOOR_DIV: &str = "FloorDiv";
pub const RIGHT_FLOOR_DIV: &str = "RightFloorDiv";
pub const MOD: &str = "Mod";
pub const RIGHT_MOD: &str = "RightMod";
pub const POW: &str = "Pow";
pub const RIGHT_POW: &str = "RightPow";
pub const BIT_XOR: &str = "BitXor";
pub const RIGHT_BIT_XOR: &str = "RightBitXor";
pub const BIT_AND: &str = "BitAnd";
pub const RIGHT_BIT_AND: &str = "RightBitAnd";
pub const BIT_OR: &str = "BitOr";
pub const RIGHT_BIT_OR: &str = "RightBitOr";
pub const BIT_LEFT: &str = "BitLeft";
pub const RIGHT_BIT_LEFT: &str = "RightBitLeft";
pub const BIT_RIGHT: &str = "BitRight";
pub const RIGHT_BIT_RIGHT: &str = "RightBitRight";
pub const AND: &str = "And";
pub const RIGHT_AND: &str = "RightAnd";
pub const OR: &str = "Or";
pub const RIGHT_OR: &str = "RightOr";
pub const XOR: &str = "Xor";
pub const RIGHT_XOR: &str = "RightXor";
pub const EQUALS: &str = "Equals";
pub const RIGHT_EQUALS: &str = "RightEquals";
pub const NOT_EQUALS: &str = "NotEquals";
pub const RIGHT_NOT_EQUALS: &str = "RightNotEquals";
pub const GREATER_THAN: &str = "GreaterThan";
pub const RIGHT_GREATER_THAN: &str = "RightGreaterThan";
pub const LESS_THAN: &str = "LessThan";
pub const RIGHT_LESS_THAN: &str = "RightLessThan";
pub const GREATER_THAN_OR_EQUAL: &str = "GreaterThanOrEqual";
pub const RIGHT_GREATER_THAN_OR_EQUAL: &str = "RightGreaterThanOrEqual";
pub const LESS_THAN_OR_EQUAL: &str = "LessThanOrEqual";
pub const RIGHT_LESS_THAN_OR_EQUAL: &str = "RightLessThanOrEqual";
pub const CONTAINS: &str = "Contains";
pub const RIGHT_CONTAINS: &str = "RightContains";

// Intrinsic type names.
pub const TYPE_NAME: &str = "Type";
pub const OBJECT_NAME: &str = "Object";
pub const FUNCTION_NAME: &str = "Function";
pub const MODULE_NAME: &str = "Module";
pub const STRING_NAME: &str = "String";
pub const BYTES_NAME: &str = "Bytes";
pub const INTEGER_NAME: &str = "Integer";
pub const FLOAT_NAME: &str = "Float";
pub const BOOL_NAME: &str = "Bool";
pub const NONE_TYPE_NAME: &str = "NoneType";
pub const TUPLE_NAME: &str = "Tuple";
pub const ARRAY_NAME: &str = "Array";
pub const HASH_TABLE_NAME: &str = "HashTable";
pub const ITERATOR_NAME: &str = "Iterator";

// Master-table singletons.
pub const NONE: &str = "None";
pub const TRUE: &str = "True";
pub const FALSE: &str = "False";
