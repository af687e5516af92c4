pub mod statement;

pub use statement::{
    AddTask, Assignment, AssignmentOperator, FunctionStart, ParseMode, Statement, StatementError,
    parse_statement,
};
