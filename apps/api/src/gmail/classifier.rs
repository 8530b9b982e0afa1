use regex::Regex;

const APPLICATION_RECEIVED: [&str; 4] = [
    r"(?i)thank.*application",
    r"(?i)received.*application",
    r"(?i)application.*received",
    r"(?i)application.*confirmation",
];

const JOB_TITLE: [&str; 3] = [
    r"(?i)position.*?([^.!?\n]+(?:developer|engineer|scientist|analyst|manager|designer)[^.!?\n]+)",
    r"(?i)role.*?([^.!?\n]+(?:developer|engineer|scientist|analyst|manager|designer)[^.!?\n]+)",
    r"(?i)(?:regarding|re:).*?([^.!?\n]+(?:developer|engineer|scientist|analyst|manager|designer)[^.!?\n]+)",
];

const COMPANY_NAME: [&str; 3] = [
    r"(?i)at\s+([A-Z][A-Za-z0-9\s&]+(?:Inc\.|LLC|Ltd\.?|Corporation|Corp\.|Limited)?)",
    r"(?i)from\s+([A-Z][A-Za-z0-9\s&]+(?:Inc\.|LLC|Ltd\.?|Corporation|Corp\.|Limited)?)",
    r"(?i)(?:welcome\s+to|joining)\s+([A-Z][A-Za-z0-9\s&]+(?:Inc\.|LLC|Ltd\.?|Corporation|Corp\.|Limited)?)",
];

/// What the classifier could pull out of an application email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailAnalysis {
    pub is_application: bool,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
}

/// Regex heuristic for application confirmation emails.
pub struct EmailClassifier {
    received: Vec<Regex>,
    job_title: Vec<Regex>,
    company_name: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

/// First capture of the first pattern that matches, trying the subject before
/// the body for each pattern.
fn first_capture(patterns: &[Regex], subject: &str, body: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(subject)
            .or_else(|| re.captures(body))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

impl EmailClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            received: compile(&APPLICATION_RECEIVED)?,
            job_title: compile(&JOB_TITLE)?,
            company_name: compile(&COMPANY_NAME)?,
        })
    }

    pub fn analyze(&self, subject: &str, body: &str) -> EmailAnalysis {
        let is_application = self
            .received
            .iter()
            .any(|re| re.is_match(subject) || re.is_match(body));
        if !is_application {
            return EmailAnalysis::default();
        }

        EmailAnalysis {
            is_application,
            job_title: first_capture(&self.job_title, subject, body),
            company_name: first_capture(&self.company_name, subject, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> EmailClassifier {
        EmailClassifier::new().unwrap()
    }

    #[test]
    fn test_not_an_application_email() {
        let analysis = classifier().analyze(
            "Your weekly digest",
            "Position: Senior Software Engineer at Globex",
        );
        assert_eq!(analysis, EmailAnalysis::default());
    }

    #[test]
    fn test_confirmation_detected_in_body_only() {
        let analysis = classifier().analyze("Hello", "We have received your application.");
        assert!(analysis.is_application);
        assert!(analysis.company_name.is_none());
    }

    #[test]
    fn test_extracts_title_and_company() {
        let analysis = classifier().analyze(
            "Thank you for your application",
            "Thanks for applying to the position of Senior Software Engineer with our team. \
             The recruiting team at Acme Corp will be in touch",
        );
        assert!(analysis.is_application);
        assert_eq!(
            analysis.job_title.as_deref(),
            Some("of Senior Software Engineer with our team")
        );
        assert_eq!(analysis.company_name.as_deref(), Some("Acme Corp will be in touch"));
    }

    #[test]
    fn test_subject_is_tried_before_body() {
        let analysis = classifier().analyze(
            "Application received from Initech",
            "Greetings from Globex",
        );
        assert_eq!(analysis.company_name.as_deref(), Some("Initech"));
    }

    #[test]
    fn test_earlier_pattern_wins_over_later() {
        // "from" appears first in the text but the "at" pattern is tried first.
        let analysis = classifier().analyze(
            "Application confirmation",
            "A note from Hooli about your interview at Pied Piper",
        );
        assert_eq!(analysis.company_name.as_deref(), Some("Pied Piper"));
    }
}
