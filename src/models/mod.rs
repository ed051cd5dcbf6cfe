pub mod completion;
pub mod course;
pub mod user;

pub use completion::{CompletionRecord, CompletionResponse};
pub use course::{
    Course, ImportCourseRequest, Lesson, Module, ModuleWithLessons, NewCourse, NewLesson, NewModule,
};
pub use user::{NewUserRequest, User};
