//! Rule-based résumé analysis

mod analyzer;
mod rules;
pub mod tables;
mod text;

pub use analyzer::{AnalyzerConfig, RuleBasedAnalyzer};
pub use tables::{keyword_table_for, KeywordTable, ResumeSection, KEYWORD_TABLE_VERSION};
pub use text::{DateStyle, ResumeDocument};

#[cfg(test)]
pub(crate) const SAMPLE_RESUME: &str = "Jane Doe
jane.doe@example.com | (555) 123-4567 | linkedin.com/in/janedoe

Professional Summary
Backend engineer with 8 years of experience building cloud services in Python and Rust.

Experience
Senior Software Engineer, Acme Corp, Jan 2020 - Present
- Led a team of 6 engineers delivering microservices on AWS and Kubernetes
- Reduced infrastructure costs by 30% by redesigning the CI/CD pipeline
- Built a REST API platform serving 2,000,000 requests per day
- Mentored junior developers and introduced agile scrum rituals

Software Engineer, Globex, Jun 2016 - Dec 2019
- Developed data processing jobs in Python and SQL
- Improved test coverage from 40% to 85% with automated testing
- Automated deployments with Docker and Git based workflows

Education
BSc Computer Science, State University, Sep 2012 - May 2016

Skills
Python, Rust, Java, SQL, AWS, Docker, Kubernetes, Linux, Git, React, Node.js, machine learning
";
