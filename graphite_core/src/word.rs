//! Raw machine-word values and the boxing factory.
//!
//! A word is an opaque 64-bit quantity used wherever the compiler or runtime
//! manipulates raw machine state (object headers, hubs, addresses). Words are
//! deliberately distinct from managed references: identity is the bit pattern
//! and nothing else.
//!
//! The three flavors are separate types with no implicit conversion:
//!
//! - [`SignedWord`]: a signed machine integer
//! - [`UnsignedWord`]: an unsigned machine integer
//! - [`PointerWord`]: an unmanaged address (also usable as unsigned)
//!
//! The zero value is bit-identical across all flavors and equals the null
//! pointer.
//!
//! # Factory Operations as Intrinsics
//!
//! Every factory operation carries a canonical [`FactoryOpcode`] through an
//! explicit registration table ([`FactoryOp`]). A downstream optimizing
//! pipeline recognizes factory calls by opcode and constant-folds them with
//! [`fold_factory_op`] instead of treating them as opaque calls.

use std::fmt;

// =============================================================================
// Word Flavors
// =============================================================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::SignedWord {}
    impl Sealed for super::UnsignedWord {}
    impl Sealed for super::PointerWord {}
}

/// Common capability of every word flavor: construction from and exposure of
/// the raw 64-bit pattern.
pub trait WordBase: Copy + Eq + sealed::Sealed {
    /// Reinterpret a raw bit pattern as this flavor.
    fn from_raw(raw: u64) -> Self;

    /// The raw 64-bit pattern. Identity of a word is exactly this value.
    fn raw(self) -> u64;
}

/// Words that carry signed-integer semantics.
pub trait SignedBase: WordBase {}

/// Words that carry unsigned-integer semantics.
pub trait UnsignedBase: WordBase {}

/// Words that carry address semantics. A pointer is an unsigned machine
/// quantity, so every pointer flavor is also [`UnsignedBase`].
pub trait PointerBase: UnsignedBase {}

/// A signed machine word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct SignedWord(u64);

/// An unsigned machine word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct UnsignedWord(u64);

/// An unmanaged address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct PointerWord(u64);

impl WordBase for SignedWord {
    #[inline]
    fn from_raw(raw: u64) -> Self {
        SignedWord(raw)
    }

    #[inline]
    fn raw(self) -> u64 {
        self.0
    }
}

impl WordBase for UnsignedWord {
    #[inline]
    fn from_raw(raw: u64) -> Self {
        UnsignedWord(raw)
    }

    #[inline]
    fn raw(self) -> u64 {
        self.0
    }
}

impl WordBase for PointerWord {
    #[inline]
    fn from_raw(raw: u64) -> Self {
        PointerWord(raw)
    }

    #[inline]
    fn raw(self) -> u64 {
        self.0
    }
}

impl SignedBase for SignedWord {}
impl UnsignedBase for UnsignedWord {}
impl UnsignedBase for PointerWord {}
impl PointerBase for PointerWord {}

impl SignedWord {
    /// The word reinterpreted as a signed 64-bit integer.
    #[inline]
    pub const fn value(self) -> i64 {
        self.0 as i64
    }
}

impl UnsignedWord {
    /// The word reinterpreted as an unsigned 64-bit integer.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl PointerWord {
    /// Whether this pointer is null (all bits clear).
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for SignedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedWord({})", self.0 as i64)
    }
}

impl fmt::Debug for UnsignedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnsignedWord({:#x})", self.0)
    }
}

impl fmt::Debug for PointerWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "PointerWord(null)")
        } else {
            write!(f, "PointerWord({:#x})", self.0)
        }
    }
}

// =============================================================================
// Factory Operation Table
// =============================================================================

/// The canonical operation class a factory call belongs to.
///
/// The optimizer keys on this tag when folding factory calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryOpcode {
    /// The constant 0. No signed/unsigned distinction exists for zero.
    Zero,
    /// Conversion treating the argument as an unsigned value.
    FromUnsigned,
    /// Conversion treating the argument as a signed value.
    FromSigned,
}

/// Every factory entry point, one variant per method.
///
/// This table replaces reflective operation tagging: each variant maps to its
/// canonical [`FactoryOpcode`] so intrinsic recognition is a plain match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryOp {
    /// [`WordFactory::zero`].
    Zero,
    /// [`WordFactory::null_pointer`].
    NullPointer,
    /// [`WordFactory::unsigned`].
    Unsigned,
    /// [`WordFactory::unsigned32`].
    Unsigned32,
    /// [`WordFactory::pointer`].
    Pointer,
    /// [`WordFactory::signed`].
    Signed,
    /// [`WordFactory::signed32`].
    Signed32,
}

impl FactoryOp {
    /// All registered factory operations.
    pub const ALL: [FactoryOp; 7] = [
        FactoryOp::Zero,
        FactoryOp::NullPointer,
        FactoryOp::Unsigned,
        FactoryOp::Unsigned32,
        FactoryOp::Pointer,
        FactoryOp::Signed,
        FactoryOp::Signed32,
    ];

    /// The canonical opcode this operation is registered under.
    #[inline]
    pub const fn opcode(self) -> FactoryOpcode {
        match self {
            FactoryOp::Zero | FactoryOp::NullPointer => FactoryOpcode::Zero,
            FactoryOp::Unsigned | FactoryOp::Unsigned32 | FactoryOp::Pointer => {
                FactoryOpcode::FromUnsigned
            }
            FactoryOp::Signed | FactoryOp::Signed32 => FactoryOpcode::FromSigned,
        }
    }

    /// Stable name used in diagnostics and intrinsic matching.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            FactoryOp::Zero => "zero",
            FactoryOp::NullPointer => "null_pointer",
            FactoryOp::Unsigned => "unsigned",
            FactoryOp::Unsigned32 => "unsigned32",
            FactoryOp::Pointer => "pointer",
            FactoryOp::Signed => "signed",
            FactoryOp::Signed32 => "signed32",
        }
    }
}

/// Constant-fold a factory operation over its raw argument bits.
///
/// For `Zero`-opcode operations the argument is ignored. 32-bit variants
/// apply the natural-width extension: zero-extension for unsigned input,
/// sign-extension for signed input.
#[inline]
pub fn fold_factory_op(op: FactoryOp, raw: u64) -> u64 {
    match op {
        FactoryOp::Zero | FactoryOp::NullPointer => 0,
        FactoryOp::Unsigned | FactoryOp::Pointer | FactoryOp::Signed => raw,
        FactoryOp::Unsigned32 => raw & 0xffff_ffff,
        FactoryOp::Signed32 => raw as u32 as i32 as i64 as u64,
    }
}

// =============================================================================
// Boxing Backend
// =============================================================================

/// The injected boxing capability supplied by the embedding runtime.
///
/// The factory routes every produced word through this backend so the
/// embedder can intern or track boxed values. The returned bits are the
/// word's identity.
pub trait BoxFactory: Send + Sync {
    /// Box a raw 64-bit pattern into the canonical bits of a word.
    fn box_raw(&self, raw: u64) -> u64;
}

/// The reference backend: boxing is the identity function.
#[derive(Debug, Default)]
pub struct RawBoxer;

impl BoxFactory for RawBoxer {
    #[inline]
    fn box_raw(&self, raw: u64) -> u64 {
        raw
    }
}

// =============================================================================
// Word Factory
// =============================================================================

/// Produces typed word values from integer literals.
///
/// Constructed once per process by [`WordRuntime::configure`] and threaded
/// by reference to every call site that needs raw machine quantities.
pub struct WordFactory {
    backend: Box<dyn BoxFactory>,
}

impl WordFactory {
    /// Create a factory over the given boxing backend.
    pub fn new(backend: Box<dyn BoxFactory>) -> Self {
        WordFactory { backend }
    }

    #[inline]
    fn boxed<T: WordBase>(&self, raw: u64) -> T {
        T::from_raw(self.backend.box_raw(raw))
    }

    /// The constant 0, the word with no bits set.
    ///
    /// There is no difference between a signed and an unsigned zero.
    /// Registered as [`FactoryOp::Zero`].
    #[inline]
    pub fn zero<T: WordBase>(&self) -> T {
        self.boxed(0)
    }

    /// The null pointer, bit-identical to [`WordFactory::zero`].
    ///
    /// Registered as [`FactoryOp::NullPointer`].
    #[inline]
    pub fn null_pointer<T: PointerBase>(&self) -> T {
        self.boxed(0)
    }

    /// Conversion treating the argument as an unsigned 64-bit value.
    ///
    /// Registered as [`FactoryOp::Unsigned`].
    #[inline]
    pub fn unsigned<T: UnsignedBase>(&self, val: u64) -> T {
        self.boxed(val)
    }

    /// Conversion treating the argument as an unsigned 32-bit value.
    ///
    /// The value is zero-extended to the full word width; the upper 32 bits
    /// of the result are always clear.
    /// Registered as [`FactoryOp::Unsigned32`].
    #[inline]
    pub fn unsigned32<T: UnsignedBase>(&self, val: u32) -> T {
        self.boxed(u64::from(val))
    }

    /// Conversion treating the argument as an unsigned address.
    ///
    /// Registered as [`FactoryOp::Pointer`].
    #[inline]
    pub fn pointer<T: PointerBase>(&self, val: u64) -> T {
        self.boxed(val)
    }

    /// Conversion treating the argument as a signed 64-bit value.
    ///
    /// Registered as [`FactoryOp::Signed`].
    #[inline]
    pub fn signed<T: SignedBase>(&self, val: i64) -> T {
        self.boxed(val as u64)
    }

    /// Conversion treating the argument as a signed 32-bit value.
    ///
    /// The value is sign-extended to the full word width.
    /// Registered as [`FactoryOp::Signed32`].
    #[inline]
    pub fn signed32<T: SignedBase>(&self, val: i32) -> T {
        self.boxed(i64::from(val) as u64)
    }
}

impl fmt::Debug for WordFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordFactory").finish_non_exhaustive()
    }
}

// =============================================================================
// Word Runtime
// =============================================================================

/// Owns the process-wide word factory.
///
/// Constructed at compiler-runtime startup, configured exactly once, then
/// threaded explicitly to call sites. This is deliberately not a global:
/// sequencing of configuration against use is the embedder's contract.
///
/// Configuring twice, or using the factory before configuration, is a caller
/// error and aborts with a fatal fault.
#[derive(Debug, Default)]
pub struct WordRuntime {
    factory: Option<WordFactory>,
}

impl WordRuntime {
    /// Create an unconfigured runtime.
    pub const fn new() -> Self {
        WordRuntime { factory: None }
    }

    /// Install the boxing backend. Fatal fault if already configured.
    pub fn configure(&mut self, backend: Box<dyn BoxFactory>) {
        assert!(
            self.factory.is_none(),
            "word factory backend configured twice"
        );
        self.factory = Some(WordFactory::new(backend));
    }

    /// Whether a backend has been installed.
    #[inline]
    pub fn is_configured(&self) -> bool {
        self.factory.is_some()
    }

    /// The configured factory. Fatal fault if unconfigured.
    #[inline]
    pub fn factory(&self) -> &WordFactory {
        self.factory
            .as_ref()
            .expect("word factory used before configuration")
    }
}

// =============================================================================
// Tests
// =============================================================================
