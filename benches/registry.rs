use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use course_registry::{Command, EnrollmentIndex, Registry, StudentId};

const FIRST_ID: StudentId = 1001;

/// Generates a registration workload for benchmarking.
///
/// Emits every course, then every student, then one registration per
/// (student, course) pair. Courses are sized to half the students, so the
/// second half of each course ends up on the waitlist.
pub struct CommandGenerator {
    num_courses: u32,
    num_students: u32,
    step: u64,
}

impl CommandGenerator {
    pub fn new(num_courses: u32, num_students: u32) -> Self {
        Self {
            num_courses,
            num_students,
            step: 0,
        }
    }

    fn course_code(course: u32) -> String {
        format!("C{course:04}")
    }
}

impl Iterator for CommandGenerator {
    type Item = Command;

    fn next(&mut self) -> Option<Self::Item> {
        let courses = self.num_courses as u64;
        let students = self.num_students as u64;
        let step = self.step;
        self.step += 1;

        if step < courses {
            return Some(Command::AddCourse {
                code: Self::course_code(step as u32),
                name: "Bench course".to_string(),
                capacity: (self.num_students / 2).max(1),
            });
        }

        let step = step - courses;
        if step < students {
            return Some(Command::AddStudent {
                id: Some(FIRST_ID + step as StudentId),
                first_name: "Bench".to_string(),
                last_name: "Student".to_string(),
            });
        }

        let step = step - students;
        if step < courses * students {
            return Some(Command::Register {
                student: FIRST_ID + (step % students) as StudentId,
                course: Self::course_code((step / students) as u32),
            });
        }

        None
    }
}

fn populated(num_courses: u32, num_students: u32) -> Registry {
    let mut registry = Registry::new();
    for command in CommandGenerator::new(num_courses, num_students) {
        let _ = registry.apply(command);
    }
    registry
}

/// Courses and students only, no registrations.
fn roster(num_courses: u32, num_students: u32) -> Registry {
    let mut registry = Registry::new();
    let setup = (num_courses + num_students) as usize;
    for command in CommandGenerator::new(num_courses, num_students).take(setup) {
        let _ = registry.apply(command);
    }
    registry
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("register");

    for (courses, students) in [(10, 100), (100, 50), (20, 1_000)] {
        let label = format!("{courses}c_{students}s");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(courses, students),
            |b, &(courses, students)| {
                b.iter(|| {
                    let mut registry = Registry::new();
                    for command in CommandGenerator::new(courses, students) {
                        let _ = black_box(registry.apply(command));
                    }
                    registry
                });
            },
        );
    }

    group.finish();
}

fn bench_drop_with_promotion(c: &mut Criterion) {
    let mut group = c.benchmark_group("drop_with_promotion");
    group.sample_size(20);

    // every drop hands the seat to a waitlisted student
    group.bench_function("10c_100s", |b| {
        b.iter_batched(
            || populated(10, 100),
            |mut registry| {
                for course in 0..10 {
                    for student in 0..50 {
                        let _ = black_box(registry.apply(Command::Drop {
                            student: FIRST_ID + student,
                            course: CommandGenerator::course_code(course),
                        }));
                    }
                }
                registry
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_transfer(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_transfer");

    for students in [1_000u32, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(students),
            &students,
            |b, &students| {
                b.iter(|| {
                    let mut index = EnrollmentIndex::new();
                    for student in FIRST_ID..FIRST_ID + students {
                        index.enroll(student, "CS101");
                    }
                    for student in FIRST_ID..FIRST_ID + students {
                        let _ = black_box(index.transfer(student, "CS101", "MATH200"));
                    }
                    index
                });
            },
        );
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for requests in [1_000u32, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(requests),
            &requests,
            |b, &requests| {
                b.iter_batched(
                    || {
                        let mut registry = roster(1, requests);
                        for offset in 0..requests {
                            let _ = registry.apply(Command::Request {
                                student: FIRST_ID + offset,
                                course: "C0000".to_string(),
                                priority: 1 + offset % 5,
                            });
                        }
                        registry
                    },
                    |mut registry| black_box(registry.apply(Command::Dispatch)),
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_register,
    bench_drop_with_promotion,
    bench_transfer,
    bench_dispatch,
);

criterion_main!(benches);
