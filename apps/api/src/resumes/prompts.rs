// Resume parsing prompt templates.

pub const RESUME_PARSE_SYSTEM: &str = "\
You are an expert resume parser. \
Extract structured data from the resume text you are given. \
You MUST respond with valid JSON only, no markdown fences and no explanations. \
Extract only information that is explicitly present in the resume; use null for anything missing.";

pub const RESUME_PARSE_PROMPT: &str = r#"Parse the following resume into a structured JSON object.

RESUME TEXT:
{resume_text}

OUTPUT SCHEMA (return exactly this structure):
{
  "personalInfo": {
    "name": "string",
    "email": "string" | null,
    "phone": "string" | null,
    "location": "City, Region" | null,
    "linkedinUrl": "string" | null,
    "githubUrl": "string" | null,
    "portfolioUrl": "string" | null
  },
  "summary": "string" | null,
  "experience": [
    {
      "company": "string",
      "position": "string",
      "startDate": "YYYY-MM",
      "endDate": "YYYY-MM" | null (null = current),
      "description": "string",
      "skills": ["string"],
      "location": "string" | null
    }
  ],
  "education": [
    {
      "institution": "string",
      "degree": "string",
      "field": "string",
      "graduationDate": "YYYY-MM" | null,
      "gpa": "string" | null
    }
  ],
  "skills": ["string"],
  "projects": [
    {
      "name": "string",
      "description": "string",
      "technologies": ["string"],
      "url": "string" | null,
      "githubUrl": "string" | null
    }
  ],
  "certifications": [
    {
      "name": "string",
      "issuer": "string",
      "issueDate": "YYYY-MM" | null,
      "expirationDate": "YYYY-MM" | null,
      "credentialId": "string" | null
    }
  ],
  "languages": ["string"]
}

RULES:
- Dates use YYYY-MM. If only a year is given, use January of that year.
- Keep skill names as written (e.g. "PostgreSQL", not "postgres").
- Omit sections with no content by returning an empty array."#;
