//! Static keyword, verb and section-heading tables used by the rule-based analyzer
//!
//! These tables are versioned business configuration. Any change to their
//! contents must bump [`KEYWORD_TABLE_VERSION`].

use serde::Serialize;

/// Version tag of the keyword, verb and heading tables
pub const KEYWORD_TABLE_VERSION: &str = "keywords-v1";

/// Keyword table for one industry
#[derive(Debug, Clone, Serialize)]
pub struct KeywordTable {
    pub industry: &'static str,
    pub aliases: &'static [&'static str],
    pub keywords: &'static [&'static str],
}

impl KeywordTable {
    /// Whether `name` refers to this table (case-insensitive)
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.industry == name || self.aliases.iter().any(|a| *a == name)
    }
}

pub static GENERAL_KEYWORDS: KeywordTable = KeywordTable {
    industry: "general",
    aliases: &[],
    keywords: &[
        "communication",
        "leadership",
        "teamwork",
        "problem solving",
        "project management",
        "collaboration",
        "time management",
        "analytical",
        "stakeholder",
        "customer service",
        "microsoft office",
        "excel",
        "presentation",
        "negotiation",
        "budget",
        "strategy",
        "process improvement",
        "training",
        "reporting",
        "planning",
        "organization",
        "attention to detail",
        "decision making",
        "cross-functional",
    ],
};

pub static INDUSTRY_KEYWORDS: &[KeywordTable] = &[
    KeywordTable {
        industry: "technology",
        aliases: &["tech", "software", "it", "information technology", "software engineering"],
        keywords: &[
            "python",
            "java",
            "javascript",
            "typescript",
            "rust",
            "go",
            "sql",
            "aws",
            "azure",
            "docker",
            "kubernetes",
            "ci/cd",
            "git",
            "rest api",
            "microservices",
            "agile",
            "scrum",
            "linux",
            "react",
            "node.js",
            "cloud",
            "machine learning",
            "data structures",
            "testing",
            "devops",
            "security",
        ],
    },
    KeywordTable {
        industry: "healthcare",
        aliases: &["health", "medical", "nursing", "clinical"],
        keywords: &[
            "patient care",
            "hipaa",
            "ehr",
            "emr",
            "clinical",
            "diagnosis",
            "treatment",
            "medication",
            "bls",
            "acls",
            "triage",
            "care plan",
            "compliance",
            "patient safety",
            "vital signs",
            "infection control",
            "medical terminology",
            "documentation",
            "epic",
            "quality improvement",
        ],
    },
    KeywordTable {
        industry: "finance",
        aliases: &["banking", "accounting", "financial services", "fintech"],
        keywords: &[
            "financial analysis",
            "forecasting",
            "budgeting",
            "gaap",
            "ifrs",
            "financial modeling",
            "reconciliation",
            "audit",
            "risk management",
            "compliance",
            "valuation",
            "excel",
            "accounts payable",
            "accounts receivable",
            "general ledger",
            "variance analysis",
            "cpa",
            "cfa",
            "tax",
            "portfolio",
            "sap",
            "quickbooks",
        ],
    },
    KeywordTable {
        industry: "marketing",
        aliases: &["digital marketing", "advertising", "communications", "pr"],
        keywords: &[
            "seo",
            "sem",
            "content marketing",
            "social media",
            "google analytics",
            "campaign",
            "brand",
            "email marketing",
            "conversion",
            "roi",
            "market research",
            "copywriting",
            "hubspot",
            "salesforce",
            "a/b testing",
            "ppc",
            "lead generation",
            "crm",
            "engagement",
            "kpi",
        ],
    },
    KeywordTable {
        industry: "sales",
        aliases: &["business development", "account management"],
        keywords: &[
            "quota",
            "pipeline",
            "prospecting",
            "crm",
            "salesforce",
            "negotiation",
            "closing",
            "account management",
            "lead generation",
            "cold calling",
            "revenue",
            "territory",
            "b2b",
            "b2c",
            "client relationship",
            "forecasting",
            "upselling",
            "presentation",
            "customer acquisition",
            "retention",
        ],
    },
    KeywordTable {
        industry: "education",
        aliases: &["teaching", "academia", "training"],
        keywords: &[
            "curriculum",
            "lesson planning",
            "classroom management",
            "assessment",
            "differentiated instruction",
            "student engagement",
            "iep",
            "learning outcomes",
            "instructional design",
            "lms",
            "mentoring",
            "tutoring",
            "pedagogy",
            "parent communication",
            "special education",
            "grading",
            "literacy",
            "stem",
        ],
    },
    KeywordTable {
        industry: "engineering",
        aliases: &["mechanical", "electrical", "civil", "manufacturing"],
        keywords: &[
            "autocad",
            "solidworks",
            "cad",
            "matlab",
            "design",
            "prototyping",
            "testing",
            "quality assurance",
            "six sigma",
            "lean",
            "root cause analysis",
            "fea",
            "specifications",
            "safety",
            "iso",
            "project management",
            "manufacturing",
            "simulation",
            "plc",
            "technical drawings",
        ],
    },
];

/// Strong action verbs that open achievement bullets
pub static ACTION_VERBS: &[&str] = &[
    "accelerated",
    "achieved",
    "analyzed",
    "architected",
    "automated",
    "built",
    "collaborated",
    "coordinated",
    "created",
    "delivered",
    "designed",
    "developed",
    "directed",
    "drove",
    "engineered",
    "established",
    "executed",
    "expanded",
    "founded",
    "generated",
    "grew",
    "headed",
    "implemented",
    "improved",
    "increased",
    "initiated",
    "launched",
    "led",
    "managed",
    "mentored",
    "negotiated",
    "optimized",
    "orchestrated",
    "produced",
    "redesigned",
    "reduced",
    "resolved",
    "saved",
    "secured",
    "spearheaded",
    "streamlined",
    "supervised",
    "trained",
    "transformed",
    "won",
];

/// Phrases that signal passive, duty-oriented writing
pub static PASSIVE_PHRASES: &[&str] = &[
    "responsible for",
    "duties included",
    "duties include",
    "tasked with",
    "worked on",
    "helped with",
    "assisted with",
    "in charge of",
];

/// Bullet glyphs that commonly break ATS text extraction
pub static UNUSUAL_BULLETS: &[char] = &[
    '●', '■', '►', '➤', '✓', '✔', '◆', '❖', '★', '☆', '→', '♦', '▪', '➢', '✦', '○', '□', '⇒',
    '»', '❯',
];

/// Canonical résumé sections recognized by heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeSection {
    Contact,
    Summary,
    Experience,
    Education,
    Skills,
    Certifications,
    Projects,
    Awards,
    Publications,
    Volunteer,
    Languages,
    Interests,
}

impl ResumeSection {
    /// Sections every ATS-friendly résumé is expected to carry
    pub const REQUIRED: [ResumeSection; 3] = [
        ResumeSection::Experience,
        ResumeSection::Education,
        ResumeSection::Skills,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Summary => "summary",
            Self::Experience => "experience",
            Self::Education => "education",
            Self::Skills => "skills",
            Self::Certifications => "certifications",
            Self::Projects => "projects",
            Self::Awards => "awards",
            Self::Publications => "publications",
            Self::Volunteer => "volunteer",
            Self::Languages => "languages",
            Self::Interests => "interests",
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            Self::Contact => "Contact",
            Self::Summary => "Summary",
            Self::Experience => "Experience",
            Self::Education => "Education",
            Self::Skills => "Skills",
            Self::Certifications => "Certifications",
            Self::Projects => "Projects",
            Self::Awards => "Awards",
            Self::Publications => "Publications",
            Self::Volunteer => "Volunteer Experience",
            Self::Languages => "Languages",
            Self::Interests => "Interests",
        }
    }
}

/// Heading variants, lowercase, mapped to their canonical section
pub static SECTION_HEADINGS: &[(&str, ResumeSection)] = &[
    ("contact", ResumeSection::Contact),
    ("contact information", ResumeSection::Contact),
    ("contact info", ResumeSection::Contact),
    ("summary", ResumeSection::Summary),
    ("professional summary", ResumeSection::Summary),
    ("career summary", ResumeSection::Summary),
    ("profile", ResumeSection::Summary),
    ("professional profile", ResumeSection::Summary),
    ("objective", ResumeSection::Summary),
    ("career objective", ResumeSection::Summary),
    ("about me", ResumeSection::Summary),
    ("experience", ResumeSection::Experience),
    ("work experience", ResumeSection::Experience),
    ("professional experience", ResumeSection::Experience),
    ("relevant experience", ResumeSection::Experience),
    ("employment", ResumeSection::Experience),
    ("employment history", ResumeSection::Experience),
    ("work history", ResumeSection::Experience),
    ("career history", ResumeSection::Experience),
    ("education", ResumeSection::Education),
    ("education and training", ResumeSection::Education),
    ("academic background", ResumeSection::Education),
    ("academic history", ResumeSection::Education),
    ("skills", ResumeSection::Skills),
    ("technical skills", ResumeSection::Skills),
    ("key skills", ResumeSection::Skills),
    ("core skills", ResumeSection::Skills),
    ("core competencies", ResumeSection::Skills),
    ("competencies", ResumeSection::Skills),
    ("areas of expertise", ResumeSection::Skills),
    ("skills and abilities", ResumeSection::Skills),
    ("certifications", ResumeSection::Certifications),
    ("certificates", ResumeSection::Certifications),
    ("licenses", ResumeSection::Certifications),
    ("licenses and certifications", ResumeSection::Certifications),
    ("certifications and licenses", ResumeSection::Certifications),
    ("projects", ResumeSection::Projects),
    ("key projects", ResumeSection::Projects),
    ("personal projects", ResumeSection::Projects),
    ("awards", ResumeSection::Awards),
    ("honors", ResumeSection::Awards),
    ("awards and honors", ResumeSection::Awards),
    ("achievements", ResumeSection::Awards),
    ("publications", ResumeSection::Publications),
    ("volunteer", ResumeSection::Volunteer),
    ("volunteer experience", ResumeSection::Volunteer),
    ("volunteering", ResumeSection::Volunteer),
    ("languages", ResumeSection::Languages),
    ("interests", ResumeSection::Interests),
    ("hobbies", ResumeSection::Interests),
];

/// Look up the keyword table for an industry.
///
/// Returns the general table and `false` when the industry is absent or unknown.
pub fn keyword_table_for(industry: Option<&str>) -> (&'static KeywordTable, bool) {
    let Some(industry) = industry.filter(|i| !i.trim().is_empty()) else {
        return (&GENERAL_KEYWORDS, true);
    };

    match INDUSTRY_KEYWORDS.iter().find(|t| t.matches(industry)) {
        Some(table) => (table, true),
        None => (&GENERAL_KEYWORDS, false),
    }
}

/// Canonical section for a heading line, if any
pub fn section_for_heading(heading: &str) -> Option<ResumeSection> {
    let heading = heading.trim().to_lowercase();

    SECTION_HEADINGS
        .iter()
        .find(|(variant, _)| *variant == heading)
        .map(|(_, section)| *section)
}
