//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use freshcart_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(5),
///     action: OrderAction::AdvanceStatus { order_id }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create an `Effect::Cancellable` delay keyed by an [`EffectId`](crate::effect::EffectId)
///
/// The id expression is evaluated before the action, so it may borrow
/// from values the action then takes by move.
///
/// # Example
///
/// ```rust,ignore
/// use freshcart_core::cancellable_delay;
///
/// cancellable_delay! {
///     id: EffectId::new(format!("progression-{order_id}")),
///     duration: Duration::from_secs(5),
///     action: OrderAction::AdvanceStatus { order_id }
/// }
/// ```
#[macro_export]
macro_rules! cancellable_delay {
    (
        id: $id:expr,
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($crate::delay! {
                duration: $duration,
                action: $action
            }),
        }
    };
}
