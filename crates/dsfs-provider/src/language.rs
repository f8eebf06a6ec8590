//! Language classification from data set naming conventions.
//!
//! The most specific qualifier usually comes last (`APP.SOURCE.COBOL`), so
//! qualifiers are scanned right to left. The high-level qualifier is an owner
//! or project prefix and is never consulted.

/// Editor language identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LanguageId {
    Jcl,
    Cobol,
    Copybook,
    Inc,
    Pli,
    Shellscript,
    Rexx,
    Xml,
    Hlasm,
    Log,
}

impl LanguageId {
    /// Conventional file extension, including the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            LanguageId::Jcl => ".jcl",
            LanguageId::Cobol => ".cbl",
            LanguageId::Copybook => ".cpy",
            LanguageId::Inc => ".inc",
            LanguageId::Pli => ".pli",
            LanguageId::Shellscript => ".sh",
            LanguageId::Rexx => ".rexx",
            LanguageId::Xml => ".xml",
            LanguageId::Hlasm => ".asm",
            LanguageId::Log => ".log",
        }
    }

    fn from_qualifier(qualifier: &str) -> Option<Self> {
        let id = match qualifier {
            "JCL" | "JCLLIB" | "CNTL" | "PROC" | "PROCLIB" => LanguageId::Jcl,
            "COBOL" | "CBL" | "COB" | "SCBL" => LanguageId::Cobol,
            "COPYBOOK" | "COPY" | "CPY" | "COBCOPY" => LanguageId::Copybook,
            "INC" | "INCLUDE" | "PLINC" => LanguageId::Inc,
            "PLI" | "PL1" | "PLX" | "PCX" => LanguageId::Pli,
            "SH" | "SHELL" => LanguageId::Shellscript,
            "REXX" | "REXEC" | "EXEC" => LanguageId::Rexx,
            "XML" => LanguageId::Xml,
            q if q == "ASM" || q.contains("ASSEMBL") => LanguageId::Hlasm,
            q if q == "LOG" || q.contains("SPFLOG") => LanguageId::Log,
            _ => return None,
        };
        Some(id)
    }
}

const MAX_QUALIFIERS: usize = 5;

/// Classify a data set name, or `PDS(MEMBER)`; the member part is ignored.
pub fn language_id(name: &str) -> Option<LanguageId> {
    let ds_name = name.split('(').next().unwrap_or_default().to_uppercase();
    let qualifiers: Vec<&str> = ds_name.split('.').take(MAX_QUALIFIERS).collect();
    qualifiers
        .iter()
        .skip(1)
        .rev()
        .find_map(|q| LanguageId::from_qualifier(q))
}
