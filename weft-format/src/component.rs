//! Raw decoded component model.
//!
//! The decoder in `weft-decoder` fills these structures in binary order
//! without resolving anything. Index spaces recorded here (function and
//! core-function references, section-appearance markers) capture exactly
//! the information the streaming validator needs to replay the sections in
//! appearance order.

use crate::prelude::*;
use crate::types::{ExternDesc, TypeDef};

/// Core sort kinds, as referenced by core aliases and core instance
/// exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreSort {
    Func,
    Table,
    Memory,
    Global,
    Type,
    Module,
    Instance,
}

impl CoreSort {
    /// Decode from the byte following a core-sort marker.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Func),
            0x01 => Some(Self::Table),
            0x02 => Some(Self::Memory),
            0x03 => Some(Self::Global),
            0x10 => Some(Self::Type),
            0x11 => Some(Self::Module),
            0x12 => Some(Self::Instance),
            _ => None,
        }
    }
}

/// Component sort kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    /// A core sort, carried with its sub-sort.
    Core(CoreSort),
    Func,
    Value,
    Type,
    Component,
    Instance,
}

/// An alias definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    /// What the alias points at.
    pub target: AliasTarget,
}

/// Alias target.
#[derive(Debug, Clone, PartialEq)]
pub enum AliasTarget {
    /// An export of a component instance.
    InstanceExport {
        /// Sort of the aliased item.
        sort: Sort,
        /// Component instance index.
        instance_idx: u32,
        /// Export name.
        name: String,
    },
    /// An export of a core instance.
    CoreInstanceExport {
        /// Core sort of the aliased item.
        sort: CoreSort,
        /// Core instance index.
        instance_idx: u32,
        /// Export name.
        name: String,
    },
    /// A definition in an enclosing scope: `count` frames up, `index`
    /// within that frame's space for `sort`.
    Outer {
        /// Sort of the aliased item.
        sort: Sort,
        /// Number of scope frames to walk outward (0 = current).
        count: u32,
        /// Index within the target frame.
        index: u32,
    },
}

/// String encoding selected by canon options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringEncoding {
    /// UTF-8 (the default).
    #[default]
    Utf8,
    /// UTF-16.
    Utf16,
    /// Compact UTF-16 (latin1 + UTF-16).
    CompactUtf16,
}

impl StringEncoding {
    /// Name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Utf16 => "utf16",
            Self::CompactUtf16 => "compact-utf16",
        }
    }
}

/// Options attached to a canon lift or lower.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanonOptions {
    /// Selected string encoding.
    pub string_encoding: StringEncoding,
    /// Memory index for string/list traffic.
    pub memory: Option<u32>,
    /// Realloc core function index.
    pub realloc: Option<u32>,
    /// Post-return core function index.
    pub post_return: Option<u32>,
    /// Async canon option; recorded and passed through.
    pub is_async: bool,
    /// Async callback core function index.
    pub callback: Option<u32>,
    /// Core type index option.
    pub core_type: Option<u32>,
    /// GC option flag.
    pub gc: bool,
}

/// A canon definition. Each canon section holds exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Canon {
    /// Turn a core function into a component function.
    Lift {
        /// Core function index being lifted.
        core_func_idx: u32,
        /// Component function type index.
        type_idx: u32,
        /// Lift options.
        options: CanonOptions,
    },
    /// Turn a component function into a core function.
    Lower {
        /// Component function index being lowered.
        func_idx: u32,
        /// Lower options.
        options: CanonOptions,
    },
    /// Produce a core function creating resource handles.
    ResourceNew {
        /// Resource type index.
        type_idx: u32,
    },
    /// Produce a core function dropping resource handles.
    ResourceDrop {
        /// Resource type index.
        type_idx: u32,
    },
    /// Async variant of resource drop.
    ResourceDropAsync {
        /// Resource type index.
        type_idx: u32,
    },
    /// Produce a core function reading a resource representation.
    ResourceRep {
        /// Resource type index.
        type_idx: u32,
    },
    /// Produce a core function cancelling the current task.
    TaskCancel,
    /// Produce a core function cancelling a subtask.
    SubtaskCancel,
}

/// One argument to a core-module instantiation; the value is always an
/// instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreInstantiateArg {
    /// Import name being satisfied.
    pub name: String,
    /// Core instance providing it.
    pub instance_idx: u32,
}

/// An export re-exposed by a from-exports core instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreExport {
    /// Export name.
    pub name: String,
    /// Core sort of the item.
    pub sort: CoreSort,
    /// Index in that sort's core index space.
    pub index: u32,
}

/// A core instance definition.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreInstance {
    /// Instantiate a core module with named instance arguments.
    Instantiate {
        /// Core module index.
        module_idx: u32,
        /// Instantiation arguments.
        args: Vec<CoreInstantiateArg>,
    },
    /// Bundle existing items into a synthetic instance.
    FromExports(Vec<CoreExport>),
}

/// One argument to a component instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantiateArg {
    /// Import name being satisfied.
    pub name: String,
    /// Sort of the provided item.
    pub sort: Sort,
    /// Index within that sort.
    pub index: u32,
}

/// An export re-exposed by a from-exports component instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineExport {
    /// Export name.
    pub name: String,
    /// Sort of the item.
    pub sort: Sort,
    /// Index within that sort.
    pub index: u32,
}

/// A component instance definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentInstance {
    /// Instantiate a nested component.
    Instantiate {
        /// Component index.
        component_idx: u32,
        /// Instantiation arguments.
        args: Vec<InstantiateArg>,
    },
    /// Bundle existing items into a synthetic instance.
    FromExports(Vec<InlineExport>),
}

/// Component start function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Start {
    /// Component function index.
    pub func_idx: u32,
    /// Value indices consumed as arguments.
    pub args: Vec<u32>,
    /// Number of result values produced.
    pub results: u32,
}

/// An import definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    /// Name-kind byte from the binary (plain or interface).
    pub name_kind: u8,
    /// Import name.
    pub name: String,
    /// Imported shape.
    pub desc: ExternDesc,
}

/// An export definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    /// Name-kind byte from the binary.
    pub name_kind: u8,
    /// Export name.
    pub name: String,
    /// Sort of the exported item.
    pub sort: Sort,
    /// Index within that sort.
    pub index: u32,
}

/// A custom section, preserved but never validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSection {
    /// Section name.
    pub name: String,
    /// Payload following the name.
    pub data: Vec<u8>,
}

/// Marker kinds recorded in the section-appearance log.
///
/// Function aliases, canon lifts, and function exports all contribute to
/// the same component function index space, interleaved across sections;
/// the validator replays these markers in order to rebuild it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Alias,
    Canon,
    Export,
    Type,
}

/// One entry of the section-appearance log: `count` items of `kind`
/// starting at index `start` of the corresponding per-kind vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMarker {
    /// Which per-kind vector the items landed in.
    pub kind: MarkerKind,
    /// First index in that vector.
    pub start: u32,
    /// Number of items.
    pub count: u32,
}

/// Origin of a component-level function index-space entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FuncRef {
    /// Brought in by a function alias on an instance export.
    AliasExport {
        /// Component instance index.
        instance_idx: u32,
        /// Export name.
        name: String,
    },
    /// Produced by a canon lift.
    CanonLift {
        /// Index into [`Component::canons`].
        canon_idx: u32,
    },
    /// Re-exported existing function.
    ExportedFunc {
        /// The function index being re-exported.
        func_idx: u32,
    },
    /// Brought in by an outer alias from an enclosing scope.
    OuterAlias {
        /// Frames to walk outward.
        count: u32,
        /// Function index in the target frame.
        index: u32,
    },
}

/// Origin of a core-function index-space entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreFuncRef {
    /// Brought in by a core alias on a core instance export.
    AliasExport {
        /// Core instance index.
        instance_idx: u32,
        /// Export name.
        name: String,
    },
    /// Produced by a canon lower.
    CanonLower {
        /// Index into [`Component::canons`].
        canon_idx: u32,
    },
    /// Produced by canon resource.new.
    ResourceNew {
        /// Resource type index.
        type_idx: u32,
    },
    /// Produced by canon resource.drop (sync or async).
    ResourceDrop {
        /// Resource type index.
        type_idx: u32,
    },
    /// Produced by canon resource.rep.
    ResourceRep {
        /// Resource type index.
        type_idx: u32,
    },
    /// Produced by canon task.cancel or subtask.cancel.
    TaskBuiltin,
}

/// A raw type-section entry: the slice it was parsed from plus the parsed
/// form when type parsing was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct RawType {
    /// Raw bytes of this type entry.
    pub data: Vec<u8>,
    /// Parsed form, present when decoding ran with `parse_types`.
    pub parsed: Option<TypeDef>,
}

/// A raw value-section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    /// Raw bytes of this value entry.
    pub data: Vec<u8>,
}

/// A decoded component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Component {
    /// Component name, from the `name` custom section if present.
    pub name: Option<String>,
    /// Core modules, kept as opaque bytes.
    pub modules: Vec<Vec<u8>>,
    /// Core instances, parsed.
    pub core_instances: Vec<CoreInstance>,
    /// Core types, kept as raw bytes.
    pub core_types: Vec<Vec<u8>>,
    /// Nested components, kept as raw bytes.
    pub nested_components: Vec<Vec<u8>>,
    /// Component instances, parsed.
    pub instances: Vec<ComponentInstance>,
    /// Aliases, parsed.
    pub aliases: Vec<Alias>,
    /// Type-section entries (raw plus optionally parsed).
    pub types: Vec<RawType>,
    /// Canon definitions, one per canon section.
    pub canons: Vec<Canon>,
    /// Start function, if declared.
    pub start: Option<Start>,
    /// Imports, in binary order.
    pub imports: Vec<Import>,
    /// Exports, in binary order.
    pub exports: Vec<Export>,
    /// Value-section entries, kept raw.
    pub values: Vec<RawValue>,
    /// Custom sections, in binary order.
    pub customs: Vec<CustomSection>,
    /// Component function index space, in binary order.
    pub func_refs: Vec<FuncRef>,
    /// Core function index space, in binary order.
    pub core_func_refs: Vec<CoreFuncRef>,
    /// Instance index → type index, where declared by an import.
    pub instance_types: BTreeMap<u32, u32>,
    /// Appearance-ordered section log for Alias/Canon/Export/Type.
    pub section_order: Vec<SectionMarker>,
    /// The raw layer/version word from the preamble.
    pub version_word: u32,
}

impl Component {
    /// Create an empty component.
    pub fn new() -> Self {
        Self::default()
    }
}
