use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::registry::CourseSummary;
use crate::{Command, StudentId};

/// Errors that can occur when reading command csv files
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized command type '{command}'")]
    UnrecognizedType { line: usize, command: String },

    #[error("line {line}: {command} missing {field}")]
    MissingField {
        line: usize,
        command: String,
        field: &'static str,
    },

    #[error("line {line}: invalid capacity '{value}'")]
    InvalidCapacity { line: usize, value: String },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    student: Option<StudentId>,
    course: Option<String>,
    target: Option<String>,
    priority: Option<u32>,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    course: String,
    capacity: u32,
    enrolled: u32,
    waitlisted: usize,
}

/// Read commands from a csv file with header
/// `type,student,course,target,priority,name`
pub fn read_commands(
    path: &Path,
) -> Result<impl Iterator<Item = Result<Command, CsvError>> + use<>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            row.into_command(line)
        }))
}

impl InputRow {
    fn into_command(self, line: usize) -> Result<Command, CsvError> {
        let missing = |command: &str, field| CsvError::MissingField {
            line,
            command: command.to_string(),
            field,
        };

        let command = match self.r#type.as_str() {
            "course" => {
                let code = self.course.ok_or_else(|| missing("course", "course"))?;
                let raw = self.target.ok_or_else(|| missing("course", "target"))?;
                let capacity = raw
                    .parse()
                    .map_err(|_| CsvError::InvalidCapacity { line, value: raw })?;
                Command::AddCourse {
                    name: self.name.unwrap_or_else(|| code.clone()),
                    code,
                    capacity,
                }
            }
            "student" => {
                let name = self.name.unwrap_or_default();
                let (first_name, last_name) = name
                    .split_once(' ')
                    .unwrap_or((name.as_str(), ""));
                Command::AddStudent {
                    id: self.student,
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                }
            }
            "register" => Command::Register {
                student: self.student.ok_or_else(|| missing("register", "student"))?,
                course: self.course.ok_or_else(|| missing("register", "course"))?,
            },
            "drop" => Command::Drop {
                student: self.student.ok_or_else(|| missing("drop", "student"))?,
                course: self.course.ok_or_else(|| missing("drop", "course"))?,
            },
            "transfer" => Command::Transfer {
                student: self.student.ok_or_else(|| missing("transfer", "student"))?,
                from: self.course.ok_or_else(|| missing("transfer", "course"))?,
                to: self.target.ok_or_else(|| missing("transfer", "target"))?,
            },
            "request" => Command::Request {
                student: self.student.ok_or_else(|| missing("request", "student"))?,
                course: self.course.ok_or_else(|| missing("request", "course"))?,
                priority: self.priority.ok_or_else(|| missing("request", "priority"))?,
            },
            "dispatch" => Command::Dispatch,
            other => {
                return Err(CsvError::UnrecognizedType {
                    line,
                    command: other.to_string(),
                });
            }
        };
        Ok(command)
    }
}

/// Write course summaries to stdout in csv format
pub fn write_summaries(summaries: impl IntoIterator<Item = CourseSummary>) -> csv::Result<()> {
    write_summaries_to(io::stdout().lock(), summaries)
}

/// Write course summaries in csv format
pub fn write_summaries_to(
    out: impl io::Write,
    summaries: impl IntoIterator<Item = CourseSummary>,
) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    for summary in summaries {
        let row = OutputRow {
            course: summary.code.to_string(),
            capacity: summary.capacity,
            enrolled: summary.enrolled,
            waitlisted: summary.waitlisted,
        };
        writer.serialize(&row)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CourseCode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,student,course,target,priority,name\n";

    fn write_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        file.write_all(rows.as_bytes()).unwrap();
        file
    }

    fn read(rows: &str) -> Vec<Result<Command, CsvError>> {
        let file = write_csv(rows);
        read_commands(file.path()).unwrap().collect()
    }

    #[test]
    fn read_course_and_student() {
        let results = read("course,,CS101,30,,Intro to CS\nstudent,1001,,,,Ada Lovelace\n");
        assert_eq!(results.len(), 2);

        assert_eq!(
            *results[0].as_ref().unwrap(),
            Command::AddCourse {
                code: "CS101".to_string(),
                name: "Intro to CS".to_string(),
                capacity: 30,
            }
        );
        assert_eq!(
            *results[1].as_ref().unwrap(),
            Command::AddStudent {
                id: Some(1001),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            }
        );
    }

    #[test]
    fn read_student_without_id() {
        let results = read("student,,,,,Grace\n");
        assert_eq!(
            *results[0].as_ref().unwrap(),
            Command::AddStudent {
                id: None,
                first_name: "Grace".to_string(),
                last_name: String::new(),
            }
        );
    }

    #[test]
    fn read_registration_commands() {
        let results = read(
            "register,1001,CS101,,,\n\
             drop,1001,CS101,,,\n\
             transfer,1001,CS101,MATH200,,\n\
             request,1002,CS101,,1,\n\
             dispatch,,,,,\n",
        );
        let commands: Vec<Command> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            commands,
            vec![
                Command::Register {
                    student: 1001,
                    course: "CS101".to_string()
                },
                Command::Drop {
                    student: 1001,
                    course: "CS101".to_string()
                },
                Command::Transfer {
                    student: 1001,
                    from: "CS101".to_string(),
                    to: "MATH200".to_string()
                },
                Command::Request {
                    student: 1002,
                    course: "CS101".to_string(),
                    priority: 1
                },
                Command::Dispatch,
            ]
        );
    }

    #[test]
    fn read_with_whitespace() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "type, student, course, target, priority, name\nregister, 1001, CS101, , ,\n",
        )
        .unwrap();
        let results: Vec<_> = read_commands(file.path()).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn read_returns_error_for_unknown_type() {
        let results = read("enroll,1001,CS101,,,\n");
        let err = results[0].as_ref().unwrap_err();
        assert!(matches!(err, CsvError::UnrecognizedType { line: 2, .. }));
    }

    #[test]
    fn read_returns_error_for_missing_fields() {
        let results = read("register,1001,CS101,,,\nregister,1001,,,,\nrequest,1001,CS101,,,\n");
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1].as_ref().unwrap_err(),
            CsvError::MissingField {
                line: 3,
                field: "course",
                ..
            }
        ));
        assert!(matches!(
            results[2].as_ref().unwrap_err(),
            CsvError::MissingField {
                line: 4,
                field: "priority",
                ..
            }
        ));
    }

    #[test]
    fn read_returns_error_for_bad_values() {
        let results = read("course,,CS101,many,,\nregister,abc,CS101,,,\n");
        assert!(matches!(
            results[0].as_ref().unwrap_err(),
            CsvError::InvalidCapacity { line: 2, .. }
        ));
        assert!(matches!(
            results[1].as_ref().unwrap_err(),
            CsvError::Parse { line: 3, .. }
        ));
    }

    #[test]
    fn open_missing_file_fails() {
        assert!(matches!(
            read_commands(Path::new("/nonexistent/commands.csv")),
            Err(CsvError::Open { .. })
        ));
    }

    #[test]
    fn write_summary_rows() {
        let mut out = Vec::new();
        let summaries = vec![CourseSummary {
            code: CourseCode::new("CS101").unwrap(),
            capacity: 2,
            enrolled: 2,
            waitlisted: 1,
        }];
        write_summaries_to(&mut out, summaries).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "course,capacity,enrolled,waitlisted\nCS101,2,2,1\n"
        );
    }
}
