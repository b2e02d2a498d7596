//! Static role table mapping corpus filename prefixes to role tags.
//!
//! The table is ordered and checked front to back; the first prefix match
//! wins, so overlapping prefixes must stay in this order. Filenames that
//! match nothing fall back to the general role.

/// One entry of the role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleInfo {
    /// Filename prefix this role is assigned from (case-sensitive)
    pub prefix: &'static str,
    /// Stable role identifier stored in chunk metadata
    pub id: &'static str,
    /// Human-readable role name
    pub display_name: &'static str,
    /// Short description shown by the list_roles tool
    pub description: &'static str,
}

/// Role id and display name assigned to files matching no prefix.
pub const FALLBACK_ROLE: (&str, &str) = ("general", "General Knowledge");

pub const ROLES: &[RoleInfo] = &[
    RoleInfo {
        prefix: "01_Solution_Architect",
        id: "solution_architect",
        display_name: "Solution Architect - Dr. Michael Torres",
        description: "System architecture, design patterns, technology selection",
    },
    RoleInfo {
        prefix: "02_Backend_Lead",
        id: "backend_lead",
        display_name: "Backend Lead - James Park",
        description: "Backend development, API design, Python/FastAPI",
    },
    RoleInfo {
        prefix: "03_Frontend_Lead",
        id: "frontend_lead",
        display_name: "Frontend Lead - David Kim",
        description: "Frontend development, React, Next.js, state management",
    },
    RoleInfo {
        prefix: "04_AI_ML_Lead",
        id: "ai_ml_lead",
        display_name: "AI/ML Lead - Dr. Lisa Wang",
        description: "AI/ML, RAG, LangChain, vector databases",
    },
    RoleInfo {
        prefix: "05_DevOps_Lead",
        id: "devops_lead",
        display_name: "DevOps Lead - Kevin Zhang",
        description: "CI/CD, Kubernetes, infrastructure automation",
    },
    RoleInfo {
        prefix: "06_Security_Lead",
        id: "security_lead",
        display_name: "Security Lead - Robert Chen",
        description: "Security, authentication/authorization, OWASP Top 10",
    },
    RoleInfo {
        prefix: "07_QA_Lead",
        id: "qa_lead",
        display_name: "QA Lead - Susan Martinez",
        description: "Test strategy, automation, quality management",
    },
    RoleInfo {
        prefix: "08_Mobile_Lead",
        id: "mobile_lead",
        display_name: "Mobile Lead - Chris Anderson",
        description: "Mobile development, React Native, Flutter",
    },
    RoleInfo {
        prefix: "09_Product_Manager",
        id: "product_manager",
        display_name: "Product Manager - Alex Chen",
        description: "Product management, PRDs, roadmaps",
    },
    RoleInfo {
        prefix: "10_Product_Owner",
        id: "product_owner",
        display_name: "Product Owner - Sarah Kim",
        description: "Agile, user stories, sprint planning",
    },
    RoleInfo {
        prefix: "11_UX_Designer",
        id: "ux_designer",
        display_name: "UX Designer - Emma Rodriguez",
        description: "UX design, accessibility, design systems",
    },
    RoleInfo {
        prefix: "12_Data_Engineer",
        id: "data_engineer",
        display_name: "Data Engineer - Michelle Liu",
        description: "Data pipelines, dbt, Airflow",
    },
    RoleInfo {
        prefix: "13_Infrastructure_Lead",
        id: "infrastructure_lead",
        display_name: "Infrastructure Lead - Mark Stevens",
        description: "Cloud infrastructure, Terraform, AWS",
    },
    RoleInfo {
        prefix: "14_Database_Engineer",
        id: "database_engineer",
        display_name: "Database Engineer - Jennifer Wu",
        description: "Database design, PostgreSQL, performance tuning",
    },
    RoleInfo {
        prefix: "15_SRE_Lead",
        id: "sre_lead",
        display_name: "SRE Lead - Thomas Wright",
        description: "SRE, SLO/SLI, monitoring, incident response",
    },
    RoleInfo {
        prefix: "16_Technical_Writer",
        id: "technical_writer",
        display_name: "Technical Writer - Emily Brown",
        description: "Technical documentation, API docs, READMEs",
    },
    RoleInfo {
        prefix: "17_Scrum_Master",
        id: "scrum_master",
        display_name: "Scrum Master - Ryan O'Brien",
        description: "Scrum, retrospectives, team facilitation",
    },
    RoleInfo {
        prefix: "18_Team_Collaboration",
        id: "team_collaboration",
        display_name: "Team Collaboration Scenarios",
        description: "Team collaboration scenarios and workflows",
    },
    RoleInfo {
        prefix: "19_Quality_Standards",
        id: "quality_standards",
        display_name: "Quality Standards Summary",
        description: "Quality standards, code review checklists",
    },
    RoleInfo {
        prefix: "20_Advanced_Topics",
        id: "advanced_topics",
        display_name: "Advanced Topics",
        description: "Advanced topics: Rust/Go, K8s operators, eBPF",
    },
    RoleInfo {
        prefix: "21_Hyperscale_Systems",
        id: "hyperscale_systems",
        display_name: "Hyperscale Systems",
        description: "Hyperscale systems: Spanner, Bigtable, TAO",
    },
    RoleInfo {
        prefix: "22_PostMortems",
        id: "postmortems",
        display_name: "Post-Mortems & War Stories",
        description: "Post-mortems and failure case studies",
    },
    RoleInfo {
        prefix: "00_README",
        id: "overview",
        display_name: "Team Overview",
        description: "Team overview and orientation",
    },
];

/// Resolve `(role_id, display_name)` for a file stem. First prefix match
/// wins; unmatched stems get [`FALLBACK_ROLE`].
#[inline]
pub fn resolve_role(file_stem: &str) -> (&'static str, &'static str) {
    for role in ROLES {
        if file_stem.starts_with(role.prefix) {
            return (role.id, role.display_name);
        }
    }
    FALLBACK_ROLE
}

/// Whether `role_id` is one of the known role identifiers.
#[inline]
pub fn is_known_role(role_id: &str) -> bool {
    ROLES.iter().any(|r| r.id == role_id)
}

/// Look up the table entry for a role id.
#[inline]
pub fn role_info(role_id: &str) -> Option<&'static RoleInfo> {
    ROLES.iter().find(|r| r.id == role_id)
}
