//! Services that can sit behind a [`crate::dispatch::BatchDispatcher`].

pub mod expression;
pub mod expression_service;

pub use expression::{
    evaluate_expression, generate_expressions, render_result, Expression, ExpressionError,
    Operator,
};
pub use expression_service::ExpressionService;
