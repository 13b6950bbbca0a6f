#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Method name the JVM uses for instance initializers.
pub(crate) const INIT: &str = "<init>";

/// Class listing: a decoded class with the instruction stream of each method.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Class {
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) super_name: Option<String>,
    #[serde(default)]
    pub(crate) methods: Vec<Method>,
    #[serde(skip)]
    pub(crate) artifact_index: i64,
}

/// A method and its instruction stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Method {
    pub(crate) name: String,
    pub(crate) descriptor: String,
    #[serde(default)]
    pub(crate) access: MethodAccess,
    #[serde(default)]
    pub(crate) events: Vec<Event>,
}

/// Method access flags used by the drivers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MethodAccess {
    #[serde(default)]
    pub(crate) is_static: bool,
}

/// The method whose body is being visited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MethodInfo {
    pub(crate) class_name: String,
    pub(crate) method_name: String,
    pub(crate) descriptor: String,
}

impl MethodInfo {
    pub(crate) fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            descriptor: descriptor.into(),
        }
    }

    pub(crate) fn for_method(class: &Class, method: &Method) -> Self {
        Self::new(&class.name, &method.name, &method.descriptor)
    }

    /// Method name followed by its descriptor, e.g. `run(I)V`.
    pub(crate) fn signature(&self) -> String {
        format!("{}{}", self.method_name, self.descriptor)
    }

    pub(crate) fn is_constructor(&self) -> bool {
        self.method_name == INIT
    }
}

/// Structural event of a method instruction stream, in program order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum Event {
    /// Zero-operand instruction (stack primitives, arithmetic, returns).
    Insn { opcode: u8 },
    /// `bipush`, `sipush`, `newarray`.
    Int { opcode: u8, operand: i32 },
    /// Local variable load or store.
    Var { opcode: u8, index: u16 },
    /// `new`, `anewarray`, `checkcast`, `instanceof`.
    Type { opcode: u8, type_name: String },
    Field {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    Invoke {
        kind: CallKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    Jump { opcode: u8, label: u32 },
    Label { id: u32 },
    Ldc { constant: Constant },
    Iinc { index: u16, delta: i16 },
    LocalVariable {
        name: String,
        descriptor: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        start: u32,
        end: u32,
        index: u16,
    },
    LineNumber { line: u32, start: u32 },
    End,
}

/// Constant pushed by `ldc`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Class literal, as a field descriptor (`Lcom/example/Foo;`).
    Type(String),
}

/// Call site extracted from an invoke event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CallSite {
    pub(crate) owner: String,
    pub(crate) name: String,
    pub(crate) descriptor: String,
    pub(crate) kind: CallKind,
}

impl CallSite {
    pub(crate) fn new(owner: &str, name: &str, descriptor: &str, kind: CallKind) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            kind,
        }
    }

    /// Describes an allocation site of `type_name` as a constructor call with no descriptor.
    pub(crate) fn construction(type_name: &str) -> Self {
        Self::new(type_name, INIT, "", CallKind::Special)
    }
}

/// Invocation opcode classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum CallKind {
    Virtual,
    Interface,
    Special,
    Static,
}

impl CallKind {
    pub(crate) fn mnemonic(self) -> &'static str {
        match self {
            CallKind::Virtual => "invokevirtual",
            CallKind::Interface => "invokeinterface",
            CallKind::Special => "invokespecial",
            CallKind::Static => "invokestatic",
        }
    }
}

/// Method parameter recovered from local variable debug records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MethodParameter {
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) type_descriptor: String,
}
