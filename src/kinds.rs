//! The closed set of tool kinds and their strategy table.
//!
//! Each [`ToolKind`] maps to one static [`KindSpec`] describing how fixtures
//! are selected, which flags form the option matrix, how output is captured
//! and named, which oracle decides correctness, and what happens after the
//! first failure. The orchestrator reads this table; it never branches on the
//! kind itself.

use serde::Serialize;
use std::fmt;

// ============================================================================
// CORE TYPES
// ============================================================================

/// A family of executables under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Bound,
    Codegen,
    Flow,
    Pip,
    Schedule,
}

impl ToolKind {
    /// Every kind, in the order `all` runs them.
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Bound,
        ToolKind::Codegen,
        ToolKind::Flow,
        ToolKind::Pip,
        ToolKind::Schedule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Bound => "bound",
            ToolKind::Codegen => "codegen",
            ToolKind::Flow => "flow",
            ToolKind::Pip => "pip",
            ToolKind::Schedule => "schedule",
        }
    }

    /// Name used in failure narration, e.g. "PIP" or "Schedule".
    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::Bound => "Bound",
            ToolKind::Codegen => "Codegen",
            ToolKind::Flow => "Flow",
            ToolKind::Pip => "PIP",
            ToolKind::Schedule => "Schedule",
        }
    }

    pub fn spec(&self) -> &'static KindSpec {
        match self {
            ToolKind::Bound => &BOUND,
            ToolKind::Codegen => &CODEGEN,
            ToolKind::Flow => &FLOW,
            ToolKind::Pip => &PIP,
            ToolKind::Schedule => &SCHEDULE,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How correctness of one configuration is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oracle {
    /// The tool checks itself (`-T`); exit status zero is a match.
    SelfTest,
    /// The configured differ compares reference and produced output.
    Differ,
    /// A dedicated comparator executable, resolved like the tool under test.
    Comparator(&'static str),
}

/// What to do with the rest of the run after a non-matching configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failure.
    StopRun,
    /// Record the failure and keep enumerating.
    Continue,
}

/// One glob rule: every file with `extension` directly inside `subdir`.
#[derive(Debug, Clone, Copy)]
pub struct GlobRule {
    pub subdir: &'static str,
    pub extension: &'static str,
}

/// How a kind's fixtures are selected beneath `<srcdir>/test_inputs`.
#[derive(Debug, Clone, Copy)]
pub enum Selection {
    Listed(&'static [&'static str]),
    Globbed(&'static [GlobRule]),
}

/// A declared matrix point.
#[derive(Debug, Clone, Copy)]
pub struct PointDef {
    pub label: &'static str,
    pub flags: &'static [&'static str],
}

/// Static description of one tool kind.
#[derive(Debug)]
pub struct KindSpec {
    pub kind: ToolKind,
    /// Declared executable name of the tool under test.
    pub tool: &'static str,
    pub oracle: Oracle,
    pub selection: Selection,
    /// Flags passed ahead of every matrix point.
    pub base_flags: &'static [&'static str],
    pub matrix: &'static [PointDef],
    /// Target extension of produced output; `None` means in-memory capture.
    pub output_ext: Option<&'static str>,
    /// Whether fixtures may carry an embedded `OPTIONS:` directive.
    pub reads_directive: bool,
    pub policy: FailurePolicy,
}

impl KindSpec {
    /// Concrete option points in declared order. An empty matrix still
    /// yields one point with no flags so each fixture runs exactly once.
    pub fn points(&self) -> Vec<OptionPoint> {
        if self.matrix.is_empty() {
            return vec![OptionPoint::empty("default")];
        }
        self.matrix.iter().map(OptionPoint::from_def).collect()
    }

    /// Every executable this kind needs, tool first.
    pub fn executables(&self) -> Vec<&'static str> {
        let mut names = vec![self.tool];
        if let Oracle::Comparator(cmp) = self.oracle {
            names.push(cmp);
        }
        names
    }

    pub fn captures_in_memory(&self) -> bool {
        self.output_ext.is_none()
    }
}

/// One concrete combination of flags exercised against a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionPoint {
    pub label: String,
    pub flags: Vec<String>,
}

impl OptionPoint {
    pub fn new(label: impl Into<String>, flags: Vec<String>) -> Self {
        Self {
            label: label.into(),
            flags,
        }
    }

    pub fn empty(label: impl Into<String>) -> Self {
        Self::new(label, Vec::new())
    }

    fn from_def(def: &PointDef) -> Self {
        Self::new(def.label, def.flags.iter().map(|f| f.to_string()).collect())
    }

    /// File-name-safe form of the label: lowercase alphanumerics, other runs
    /// collapsed to a single `-`.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.label.len());
        for c in self.label.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        slug
    }
}

// ============================================================================
// STRATEGY TABLE
// ============================================================================

const BOUND_FIXTURES: &[&str] = &[
    "basicLinear2.pwqp",
    "basicLinear.pwqp",
    "basicTestParameterPosNeg.pwqp",
    "basicTest.pwqp",
    "devos.pwqp",
    "equality1.pwqp",
    "equality2.pwqp",
    "equality3.pwqp",
    "equality4.pwqp",
    "equality5.pwqp",
    "faddeev.pwqp",
    "linearExample.pwqp",
    "neg.pwqp",
    "philippe3vars3pars.pwqp",
    "philippe3vars.pwqp",
    "philippeNeg.pwqp",
    "philippePolynomialCoeff1P.pwqp",
    "philippePolynomialCoeff.pwqp",
    "philippe.pwqp",
    "product.pwqp",
    "split.pwqp",
    "test3Deg3Var.pwqp",
    "toplas.pwqp",
    "unexpanded.pwqp",
];

const PIP_FIXTURES: &[&str] = &[
    "boulet.pip",
    "brisebarre.pip",
    "cg1.pip",
    "esced.pip",
    "ex2.pip",
    "ex.pip",
    "exist.pip",
    "exist2.pip",
    "fimmel.pip",
    "max.pip",
    "negative.pip",
    "seghir-vd.pip",
    "small.pip",
    "sor1d.pip",
    "square.pip",
    "sven.pip",
    "tobi.pip",
];

static BOUND: KindSpec = KindSpec {
    kind: ToolKind::Bound,
    tool: "isl_bound",
    oracle: Oracle::SelfTest,
    selection: Selection::Listed(BOUND_FIXTURES),
    base_flags: &["-T"],
    matrix: &[
        PointDef {
            label: "bernstein",
            flags: &["--bound=bernstein"],
        },
        PointDef {
            label: "range",
            flags: &["--bound=range"],
        },
    ],
    output_ext: None,
    reads_directive: false,
    policy: FailurePolicy::StopRun,
};

static PIP: KindSpec = KindSpec {
    kind: ToolKind::Pip,
    tool: "isl_pip",
    oracle: Oracle::SelfTest,
    selection: Selection::Listed(PIP_FIXTURES),
    base_flags: &["-T"],
    matrix: &[
        PointDef {
            label: "--format=set --context=gbr",
            flags: &["--format=set", "--context=gbr"],
        },
        PointDef {
            label: "--format=set --context=lexmin",
            flags: &["--format=set", "--context=lexmin"],
        },
        PointDef {
            label: "--format=affine --context=gbr",
            flags: &["--format=affine", "--context=gbr"],
        },
        PointDef {
            label: "--format=affine --context=lexmin",
            flags: &["--format=affine", "--context=lexmin"],
        },
    ],
    output_ext: None,
    reads_directive: false,
    policy: FailurePolicy::StopRun,
};

static CODEGEN: KindSpec = KindSpec {
    kind: ToolKind::Codegen,
    tool: "isl_codegen",
    oracle: Oracle::Differ,
    selection: Selection::Globbed(&[
        GlobRule {
            subdir: "codegen",
            extension: "st",
        },
        GlobRule {
            subdir: "codegen/cloog",
            extension: "st",
        },
        GlobRule {
            subdir: "codegen",
            extension: "in",
        },
        GlobRule {
            subdir: "codegen/omega",
            extension: "in",
        },
        GlobRule {
            subdir: "codegen/pldi2012",
            extension: "in",
        },
    ]),
    base_flags: &[],
    matrix: &[PointDef {
        label: "code generation and diff check",
        flags: &[],
    }],
    output_ext: Some("c"),
    reads_directive: false,
    policy: FailurePolicy::Continue,
};

static FLOW: KindSpec = KindSpec {
    kind: ToolKind::Flow,
    tool: "isl_flow",
    oracle: Oracle::Comparator("isl_flow_cmp"),
    selection: Selection::Globbed(&[GlobRule {
        subdir: "flow",
        extension: "ai",
    }]),
    base_flags: &[],
    matrix: &[PointDef {
        label: "flow test and comparison",
        flags: &[],
    }],
    output_ext: Some("flow"),
    reads_directive: false,
    policy: FailurePolicy::Continue,
};

static SCHEDULE: KindSpec = KindSpec {
    kind: ToolKind::Schedule,
    tool: "isl_schedule",
    oracle: Oracle::Comparator("isl_schedule_cmp"),
    selection: Selection::Globbed(&[GlobRule {
        subdir: "schedule",
        extension: "sc",
    }]),
    base_flags: &[],
    matrix: &[
        PointDef {
            label: "--schedule-whole-component",
            flags: &["--schedule-whole-component"],
        },
        PointDef {
            label: "--no-schedule-whole-component",
            flags: &["--no-schedule-whole-component"],
        },
    ],
    output_ext: Some("st"),
    reads_directive: true,
    policy: FailurePolicy::Continue,
};
