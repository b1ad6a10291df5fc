//! Flag types and operator enums for the AST.

use serde::{Deserialize, Serialize};
use std::fmt;

bitflags::bitflags! {
    /// Java modifiers. A set, so repeated modifiers collapse.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Modifiers: u16 {
        const PUBLIC       = 1 << 0;
        const PRIVATE      = 1 << 1;
        const PROTECTED    = 1 << 2;
        const STATIC       = 1 << 3;
        const FINAL        = 1 << 4;
        const ABSTRACT     = 1 << 5;
        const SYNCHRONIZED = 1 << 6;
        const TRANSIENT    = 1 << 7;
        const VOLATILE     = 1 << 8;
        const NATIVE       = 1 << 9;
        const STRICTFP     = 1 << 10;

        const ACCESS = Self::PUBLIC.bits() | Self::PRIVATE.bits() | Self::PROTECTED.bits();
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::empty()
    }
}

impl Modifiers {
    /// Keywords in canonical Java order.
    pub fn keywords(self) -> Vec<&'static str> {
        const ORDER: &[(Modifiers, &str)] = &[
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::ABSTRACT, "abstract"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
            (Modifiers::TRANSIENT, "transient"),
            (Modifiers::VOLATILE, "volatile"),
            (Modifiers::SYNCHRONIZED, "synchronized"),
            (Modifiers::NATIVE, "native"),
            (Modifiers::STRICTFP, "strictfp"),
        ];
        ORDER
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, kw)| *kw)
            .collect()
    }

    /// Replace the access bits, keeping every other modifier.
    pub fn with_access(self, access: AccessLevel) -> Self {
        (self - Modifiers::ACCESS) | access.modifiers()
    }

    pub fn access(self) -> AccessLevel {
        if self.contains(Modifiers::PUBLIC) {
            AccessLevel::Public
        } else if self.contains(Modifiers::PROTECTED) {
            AccessLevel::Protected
        } else if self.contains(Modifiers::PRIVATE) {
            AccessLevel::Private
        } else {
            AccessLevel::Package
        }
    }
}

bitflags::bitflags! {
    /// Flags for declarations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct NodeFlags: u8 {
        /// Produced by a handler rather than written by the user.
        const SYNTHESIZED = 1 << 0;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Access level as used by annotation parameters such as `@FluentSetter(AccessLevel.PROTECTED)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    Public,
    Protected,
    Package,
    Private,
    /// Generate nothing.
    None,
}

impl AccessLevel {
    pub fn modifiers(self) -> Modifiers {
        match self {
            AccessLevel::Public => Modifiers::PUBLIC,
            AccessLevel::Protected => Modifiers::PROTECTED,
            AccessLevel::Private => Modifiers::PRIVATE,
            AccessLevel::Package | AccessLevel::None => Modifiers::empty(),
        }
    }

    /// Parse an enum constant name (`PUBLIC`, `MODULE`, `NONE`, ...).
    pub fn from_constant(name: &str) -> Option<Self> {
        let simple = name.rsplit('.').next().unwrap_or(name);
        match simple {
            "PUBLIC" => Some(AccessLevel::Public),
            "PROTECTED" => Some(AccessLevel::Protected),
            "PACKAGE" | "MODULE" => Some(AccessLevel::Package),
            "PRIVATE" => Some(AccessLevel::Private),
            "NONE" => Some(AccessLevel::None),
            _ => None,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    /// Java precedence, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 3,
            BinaryOp::And => 4,
            BinaryOp::BitOr => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitAnd => 7,
            BinaryOp::Eq | BinaryOp::Ne => 8,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 9,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 10,
            BinaryOp::Add | BinaryOp::Sub => 11,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 12,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators, prefix and postfix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_set_collapses_duplicates() {
        let mods = Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::PUBLIC;
        assert_eq!(mods.keywords(), vec!["public", "static"]);
    }

    #[test]
    fn test_with_access_replaces_only_access_bits() {
        let mods = Modifiers::PUBLIC | Modifiers::FINAL;
        let demoted = mods.with_access(AccessLevel::Package);
        assert_eq!(demoted, Modifiers::FINAL);
        assert_eq!(demoted.access(), AccessLevel::Package);
        assert_eq!(
            Modifiers::STATIC.with_access(AccessLevel::Private).keywords(),
            vec!["private", "static"]
        );
    }

    #[test]
    fn test_access_level_from_constant() {
        assert_eq!(AccessLevel::from_constant("AccessLevel.PROTECTED"), Some(AccessLevel::Protected));
        assert_eq!(AccessLevel::from_constant("NONE"), Some(AccessLevel::None));
        assert_eq!(AccessLevel::from_constant("WHATEVER"), None);
    }
}
