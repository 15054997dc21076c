//! The fixed rule table the scanner evaluates against.
//!
//! Each [`Rule`] is a static value: an id, a scope (single line or whole
//! document), a detector, a severity and the template the fix generator
//! uses to synthesize a fix. Regexes compile lazily on first use; a
//! pattern that fails to compile disables its rule instead of panicking.

use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

use crate::models::Severity;
use crate::refactor::RefactorKind;

macro_rules! latex_pattern {
    ($name:ident, $regex_str:expr) => {
        pub static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// ── Dangerous commands ─────────────────────────────────────────────────────
latex_pattern!(RE_SHELL_ESCAPE, r"(?i)\\immediate\s*\\write18|\\write18|\\immediate\s*\\write");
latex_pattern!(RE_INPUT_ARG, r"\\(input|include)\s*\{([^}]*)\}");
latex_pattern!(RE_DRIVE_PATH, r"^[A-Za-z]:");

// ── Style and deprecation ──────────────────────────────────────────────────
latex_pattern!(RE_OLD_FONT, r"\{\\(bf|it|rm|tt|sf|sc|sl|em)\s+([^{}]*)\}");
latex_pattern!(RE_REF_SPACE, r"(\S)[ \t]+\\(ref|eqref|pageref|autoref|cref)\{");
latex_pattern!(RE_EQNARRAY_BEGIN, r"\\begin\{eqnarray(\*?)\}");
latex_pattern!(RE_EQNARRAY_END, r"\\end\{eqnarray(\*?)\}");
latex_pattern!(RE_DOLLAR_DISPLAY, r"\$\$([\s\S]*?)\$\$");
latex_pattern!(RE_ITEMIZE, r"\\(begin|end)\{itemize\}");
latex_pattern!(RE_ENUMERATE, r"\\(begin|end)\{enumerate\}");

// ── Structure ──────────────────────────────────────────────────────────────
latex_pattern!(RE_LABEL, r"\\label\{([^}]+)\}");
latex_pattern!(RE_CITE, r"\\cite[pt]?\*?(?:\[[^\]]*\])*\{([^}]+)\}");
latex_pattern!(RE_BIBLIOGRAPHY, r"\\bibliography\{([^}]*)\}");
latex_pattern!(RE_BEGIN_ENV, r"\\begin\{([^}]+)\}");
latex_pattern!(RE_END_ENV, r"\\end\{([^}]+)\}");
latex_pattern!(RE_END_TRAILING, r"\\end\{[^}]+\}(.+)$");
latex_pattern!(RE_FIGURE, r"(?s)\\begin\{figure\*?\}.*?\\end\{figure\*?\}");
latex_pattern!(RE_TABLE, r"(?s)\\begin\{table\*?\}.*?\\end\{table\*?\}");
latex_pattern!(RE_CAPTION, r"\\caption(?:\[[^\]]*\])?\{");
latex_pattern!(RE_AMSMATH_ENV, r"\\begin\{(align|gather|multline|flalign|alignat)\*?\}");
latex_pattern!(RE_USEPACKAGE, r"\\usepackage(?:\[[^\]]*\])?\{([^}]*)\}");
latex_pattern!(RE_DOCUMENTCLASS_LINE, r"\\documentclass(?:\[[^\]]*\])?\{[^}]*\}[^\n]*");

// Commands whose braced argument is a key or path, not typeset text.
latex_pattern!(
    RE_ARGUMENT_COMMANDS,
    r"\\(?:label|ref|eqref|pageref|autoref|cref|cite[a-z]*|includegraphics|input|include|url|href|bibliography|bibliographystyle|usepackage|documentclass|begin|end|newcommand|renewcommand)\*?(?:\[[^\]]*\])?\{[^}]*\}"
);

/// Borrow a lazily compiled pattern, if it compiled.
pub fn re(pattern: &'static LazyLock<Option<Regex>>) -> Option<&'static Regex> {
    pattern.as_ref()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Line,
    Document,
}

#[derive(Clone, Copy)]
pub enum Detector {
    /// Every match on a comment-stripped line is an issue.
    LineMatch(&'static LazyLock<Option<Regex>>),
    /// Every match in the comment-stripped document is an issue.
    DocumentMatch(&'static LazyLock<Option<Regex>>),
    /// Hand-written check in the scanner.
    Structural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    Insert,
    Delete,
    Replace,
    ReplacePattern,
    Refactor,
    InsertPackage,
}

#[derive(Clone, Copy)]
/// Data the fix generator needs to synthesize a fix for a rule.
pub enum FixTemplate {
    None,
    /// Replace the offending line with the issue's corrected line.
    ReplaceLine,
    /// Substitute the detector's pattern across the text.
    ReplacePattern { replacement: &'static str },
    /// Substitute the literal matched text with a computed replacement.
    ReplaceMatch(fn(&Captures) -> String),
    Refactor(RefactorKind),
    InsertPackage(&'static str),
    /// Insert `\label{<prefix>:<n>}` after the caption.
    InsertLabel { prefix: &'static str },
    /// Delete the range the scanner located.
    DeleteRange,
}

/// A static detection rule.
pub struct Rule {
    pub id: &'static str,
    pub scope: Scope,
    pub detector: Detector,
    pub severity: Severity,
    pub auto_fixable: bool,
    pub fix: FixTemplate,
    /// Message template; `{match}` expands to the matched text.
    pub message: &'static str,
}

impl Rule {
    pub fn fix_type(&self) -> Option<FixType> {
        match self.fix {
            FixTemplate::None => None,
            FixTemplate::ReplaceLine => Some(FixType::Replace),
            FixTemplate::ReplacePattern { .. } | FixTemplate::ReplaceMatch(_) => {
                Some(FixType::ReplacePattern)
            }
            FixTemplate::Refactor(_) => Some(FixType::Refactor),
            FixTemplate::InsertPackage(_) => Some(FixType::InsertPackage),
            FixTemplate::InsertLabel { .. } => Some(FixType::Insert),
            FixTemplate::DeleteRange => Some(FixType::Delete),
        }
    }

    /// Expand the message template for a matched text.
    pub fn render(&self, matched: &str) -> String {
        self.message.replace("{match}", matched)
    }
}

const fn structural(
    id: &'static str,
    scope: Scope,
    severity: Severity,
    fix: FixTemplate,
    message: &'static str,
) -> Rule {
    Rule {
        id,
        scope,
        detector: Detector::Structural,
        severity,
        auto_fixable: !matches!(fix, FixTemplate::None),
        fix,
        message,
    }
}

// ── Line rules ─────────────────────────────────────────────────────────────

pub static LINE_BRACE_BALANCE: Rule = structural(
    "line_brace_balance",
    Scope::Line,
    Severity::Warning,
    FixTemplate::None,
    "Unbalanced braces on this line",
);
pub static TYPO_COMMAND: Rule = structural(
    "typo_command",
    Scope::Line,
    Severity::Error,
    FixTemplate::ReplaceLine,
    "Possible typo",
);
pub static MATH_MODE: Rule = structural(
    "math_mode",
    Scope::Line,
    Severity::Error,
    FixTemplate::None,
    "Subscript/superscript outside math mode",
);
pub static QUOTE_STYLE: Rule = structural(
    "quote_style",
    Scope::Line,
    Severity::Warning,
    FixTemplate::ReplaceLine,
    "Use `` and '' instead of \" for quotes in LaTeX",
);
pub static TRAILING_LINE_BREAK: Rule = structural(
    "trailing_line_break",
    Scope::Line,
    Severity::Warning,
    FixTemplate::None,
    "Line ends with \\\\ outside a tabular or alignment environment",
);
pub static MISSING_PACKAGE_GRAPHICX: Rule = structural(
    "missing_package_graphicx",
    Scope::Line,
    Severity::Error,
    FixTemplate::InsertPackage("graphicx"),
    "\\includegraphics used but package graphicx is not loaded",
);
pub static TRAILING_WHITESPACE: Rule = structural(
    "trailing_whitespace",
    Scope::Line,
    Severity::Warning,
    FixTemplate::ReplaceLine,
    "Trailing whitespace",
);
pub static LINE_LENGTH: Rule = structural(
    "line_length",
    Scope::Line,
    Severity::Warning,
    FixTemplate::None,
    "Line too long",
);
pub static FORBIDDEN_WRITE18: Rule = Rule {
    id: "forbidden_write18",
    scope: Scope::Line,
    detector: Detector::LineMatch(&RE_SHELL_ESCAPE),
    severity: Severity::Error,
    auto_fixable: false,
    fix: FixTemplate::None,
    message: "Forbidden command {match} (shell escape)",
};
pub static FORBIDDEN_INPUT_PATH: Rule = structural(
    "forbidden_input_path",
    Scope::Line,
    Severity::Error,
    FixTemplate::None,
    "Forbidden file reference",
);
pub static OLD_FONT_COMMANDS: Rule = Rule {
    id: "old_font_commands",
    scope: Scope::Line,
    detector: Detector::LineMatch(&RE_OLD_FONT),
    severity: Severity::Warning,
    auto_fixable: true,
    fix: FixTemplate::ReplaceMatch(modern_font),
    message: "Obsolete font command {match}",
};
pub static NON_BREAKING_SPACE: Rule = Rule {
    id: "non_breaking_space",
    scope: Scope::Line,
    detector: Detector::LineMatch(&RE_REF_SPACE),
    severity: Severity::Warning,
    auto_fixable: true,
    fix: FixTemplate::ReplacePattern {
        replacement: r"${1}~\${2}{",
    },
    message: "Use a non-breaking space (~) before references: {match}",
};
pub static DEPRECATED_EQNARRAY: Rule = Rule {
    id: "deprecated_eqnarray",
    scope: Scope::Line,
    detector: Detector::LineMatch(&RE_EQNARRAY_BEGIN),
    severity: Severity::Warning,
    auto_fixable: true,
    fix: FixTemplate::Refactor(RefactorKind::EqnarrayToAlign),
    message: "Deprecated environment {match}; use align from amsmath",
};

// ── Document rules ─────────────────────────────────────────────────────────

pub static MULTIPLE_DOCUMENTCLASS: Rule = structural(
    "multiple_documentclass",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "Multiple \\documentclass commands",
);
pub static MULTIPLE_BEGIN_DOCUMENT: Rule = structural(
    "multiple_begin_document",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "Multiple \\begin{document}",
);
pub static MULTIPLE_END_DOCUMENT: Rule = structural(
    "multiple_end_document",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "Multiple \\end{document}",
);
pub static CONTENT_AFTER_END_DOCUMENT: Rule = structural(
    "content_after_end_document",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "Content after \\end{document}",
);
pub static DUPLICATE_LABEL: Rule = structural(
    "duplicate_label",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "Duplicate label",
);
pub static MISSING_BIBLIOGRAPHY: Rule = structural(
    "missing_bibliography",
    Scope::Document,
    Severity::Warning,
    FixTemplate::None,
    "Found \\cite commands but no \\bibliography or thebibliography environment",
);
pub static BIBLIOGRAPHY_FILE: Rule = structural(
    "bibliography_file",
    Scope::Document,
    Severity::Warning,
    FixTemplate::None,
    "Bibliography file referenced",
);
pub static TEXT_AFTER_END: Rule = structural(
    "text_after_end",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "Text found after \\end command",
);
pub static UNBALANCED_BRACES: Rule = structural(
    "unbalanced_braces",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "Unbalanced braces",
);
pub static UNBALANCED_ENVIRONMENT: Rule = structural(
    "unbalanced_environment",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "Unbalanced environment",
);
pub static MISSING_DOCUMENTCLASS: Rule = structural(
    "missing_documentclass",
    Scope::Document,
    Severity::Warning,
    FixTemplate::None,
    "No \\documentclass found",
);
pub static MISSING_BEGIN_DOCUMENT: Rule = structural(
    "missing_begin_document",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "No \\begin{document} found",
);
pub static MISSING_END_DOCUMENT: Rule = structural(
    "missing_end_document",
    Scope::Document,
    Severity::Error,
    FixTemplate::None,
    "No \\end{document} found",
);
pub static DEPRECATED_DOLLAR_DISPLAY: Rule = Rule {
    id: "deprecated_dollar_display",
    scope: Scope::Document,
    detector: Detector::DocumentMatch(&RE_DOLLAR_DISPLAY),
    severity: Severity::Warning,
    auto_fixable: true,
    fix: FixTemplate::Refactor(RefactorKind::DollarToDisplaymath),
    message: "Deprecated $$...$$ display math; use \\[...\\]",
};
pub static MISSING_LABEL_IN_FIGURE: Rule = structural(
    "missing_label_in_figure",
    Scope::Document,
    Severity::Warning,
    FixTemplate::InsertLabel { prefix: "fig" },
    "Figure has a \\caption but no \\label",
);
pub static MISSING_LABEL_IN_TABLE: Rule = structural(
    "missing_label_in_table",
    Scope::Document,
    Severity::Warning,
    FixTemplate::InsertLabel { prefix: "tab" },
    "Table has a \\caption but no \\label",
);
pub static MISSING_PACKAGE_AMSMATH: Rule = structural(
    "missing_package_amsmath",
    Scope::Document,
    Severity::Error,
    FixTemplate::InsertPackage("amsmath"),
    "amsmath environment used but package amsmath is not loaded",
);
pub static PARAGRAPH_SPACING: Rule = structural(
    "paragraph_spacing",
    Scope::Document,
    Severity::Warning,
    FixTemplate::DeleteRange,
    "Multiple consecutive blank lines",
);

/// Every rule, line rules first.
pub static RULES: [&Rule; 31] = [
    &LINE_BRACE_BALANCE,
    &TYPO_COMMAND,
    &MATH_MODE,
    &QUOTE_STYLE,
    &TRAILING_LINE_BREAK,
    &MISSING_PACKAGE_GRAPHICX,
    &TRAILING_WHITESPACE,
    &LINE_LENGTH,
    &FORBIDDEN_WRITE18,
    &FORBIDDEN_INPUT_PATH,
    &OLD_FONT_COMMANDS,
    &NON_BREAKING_SPACE,
    &DEPRECATED_EQNARRAY,
    &MULTIPLE_DOCUMENTCLASS,
    &MULTIPLE_BEGIN_DOCUMENT,
    &MULTIPLE_END_DOCUMENT,
    &CONTENT_AFTER_END_DOCUMENT,
    &DUPLICATE_LABEL,
    &MISSING_BIBLIOGRAPHY,
    &BIBLIOGRAPHY_FILE,
    &TEXT_AFTER_END,
    &UNBALANCED_BRACES,
    &UNBALANCED_ENVIRONMENT,
    &MISSING_DOCUMENTCLASS,
    &MISSING_BEGIN_DOCUMENT,
    &MISSING_END_DOCUMENT,
    &DEPRECATED_DOLLAR_DISPLAY,
    &MISSING_LABEL_IN_FIGURE,
    &MISSING_LABEL_IN_TABLE,
    &MISSING_PACKAGE_AMSMATH,
    &PARAGRAPH_SPACING,
];

/// Look up a rule by id.
pub fn rule(id: &str) -> Option<&'static Rule> {
    RULES.iter().copied().find(|r| r.id == id)
}

fn modern_font(caps: &Captures) -> String {
    let cmd = match &caps[1] {
        "bf" => "textbf",
        "it" => "textit",
        "rm" => "textrm",
        "tt" => "texttt",
        "sf" => "textsf",
        "sc" => "textsc",
        "sl" => "textsl",
        _ => "emph",
    };
    format!("\\{}{{{}}}", cmd, caps[2].trim_end())
}

/// Known misspellings and their correction.
pub static TYPOS: &[(&str, &str)] = &[
    ("\\nd{", "\\end{"),
    ("\\ned{", "\\end{"),
    ("\\edn{", "\\end{"),
    ("\\begn{", "\\begin{"),
    ("\\beign{", "\\begin{"),
    ("\\bgein{", "\\begin{"),
    ("\\sectoin{", "\\section{"),
    ("\\secton{", "\\section{"),
    ("\\subsectoin{", "\\subsection{"),
    ("\\usepackge{", "\\usepackage{"),
    ("\\usepakage{", "\\usepackage{"),
    ("\\documentclas{", "\\documentclass{"),
    ("\\lable{", "\\label{"),
    ("\\captoin{", "\\caption{"),
    ("\\textbd{", "\\textbf{"),
];

/// Environments whose body is typeset in math mode.
pub static MATH_ENVS: &[&str] = &[
    "equation", "equation*", "align", "align*", "eqnarray", "eqnarray*", "gather", "gather*",
    "multline", "multline*", "flalign", "flalign*", "alignat", "alignat*", "displaymath", "math",
];

/// Environments where a trailing `\\` is the normal row/line separator.
pub static LINE_BREAK_ENVS: &[&str] = &[
    "tabular", "tabular*", "tabularx", "longtable", "array", "align", "align*", "eqnarray",
    "eqnarray*", "gather", "gather*", "multline", "multline*", "flalign", "flalign*",
    "alignat", "alignat*", "split", "cases", "matrix", "pmatrix", "bmatrix", "vmatrix",
    "Vmatrix", "tabbing", "verse",
];

/// Advisory package hint: any trigger present without the package loaded.
pub struct PackageHint {
    pub package: &'static str,
    pub reason: &'static str,
    pub triggers: &'static [&'static str],
}

pub static PACKAGE_HINTS: &[PackageHint] = &[
    PackageHint {
        package: "amsmath",
        reason: "For enhanced math support",
        triggers: &["$", "\\["],
    },
    PackageHint {
        package: "graphicx",
        reason: "Required for \\includegraphics",
        triggers: &["\\includegraphics"],
    },
    PackageHint {
        package: "xcolor",
        reason: "Required for color commands",
        triggers: &["\\color", "\\textcolor"],
    },
    PackageHint {
        package: "hyperref",
        reason: "Required for hyperlinks",
        triggers: &["\\href", "\\url"],
    },
];
