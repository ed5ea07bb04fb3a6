use std::sync::Arc;

use tracing::warn;

use super::base::{Callback, Invoke};
use crate::error::CallbackError;

/// Multicast over any mix of callbacks.
///
/// Members are invoked in registration order, each with its own clone of
/// the arguments. Deferred members only guarantee issue order, not
/// completion order. A failing member does not stop the rest; the first
/// error is returned once every member has been called.
pub struct CallbackList<A> {
    callbacks: Arc<[Callback<A>]>,
}

impl<A: Clone> CallbackList<A> {
    pub fn new<I>(callbacks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Callback<A>>,
    {
        Self {
            callbacks: callbacks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn call(&self, args: A) -> Result<(), CallbackError> {
        let mut first_error = None;
        for (index, callback) in self.callbacks.iter().enumerate() {
            if let Err(err) = callback.call(args.clone()) {
                warn!(index, %err, "callback list member failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<A> Clone for CallbackList<A> {
    fn clone(&self) -> Self {
        Self {
            callbacks: Arc::clone(&self.callbacks),
        }
    }
}

impl<A, C> FromIterator<C> for CallbackList<A>
where
    A: Clone,
    C: Into<Callback<A>>,
{
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<A: Clone> Invoke<A> for CallbackList<A> {
    fn invoke(&self, args: A) -> Result<(), CallbackError> {
        self.call(args)
    }
}

impl<A: Clone + 'static> From<CallbackList<A>> for Callback<A> {
    fn from(list: CallbackList<A>) -> Self {
        Callback::from_invoke(list)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::callback::{DeferredCallback, DirectCallback};
    use crate::component::{AsComponent, Component};
    use crate::runtime::Root;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        component: Component,
    }

    impl Recorder {
        fn on_value(&self, (value, label): (i32, String)) {
            self.seen.lock().unwrap().push(format!("{label}:{value}"));
        }
    }

    impl AsComponent for Recorder {
        fn as_component(&self) -> &Component {
            &self.component
        }
    }

    fn recorder(root: &Root) -> Arc<Recorder> {
        Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            component: Component::new(root),
        })
    }

    #[test]
    fn direct_members_run_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let list: CallbackList<u16> = (0..3)
            .map(|member| {
                let seen = Arc::clone(&seen);
                DirectCallback::new(move |value: u16| seen.lock().unwrap().push((member, value)))
            })
            .collect();

        list.call(127).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 127), (1, 127), (2, 127)]);
    }

    #[test]
    fn mixed_members_issue_in_order() {
        let root = Root::new().unwrap();
        let recorder = recorder(&root);

        let list: Callback<(i32, String)> = CallbackList::new([
            Callback::from(DeferredCallback::bind(&recorder, Recorder::on_value)),
            DirectCallback::bind(&recorder, Recorder::on_value).into(),
            DeferredCallback::new(&root, {
                let recorder = Arc::clone(&recorder);
                move |(value, label): (i32, String)| recorder.on_value((value * 2, label))
            })
            .into(),
        ])
        .into();

        list.call((42, "x".to_string())).unwrap();
        // direct のメンバーだけが即座に実行される
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["x:42"]);

        let reactor = root.context();
        root.post(move || reactor.stop());
        root.run();

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["x:42", "x:42", "x:84"]);
    }

    #[test]
    fn failing_member_does_not_stop_the_rest() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let list = CallbackList::new([
            Callback::<u16>::default(),
            Callback::direct({
                let seen = Arc::clone(&seen);
                move |value: u16| seen.lock().unwrap().push(value)
            }),
        ]);

        assert_eq!(list.call(7), Err(CallbackError::Unbound));
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let list = CallbackList::<u16>::new(Vec::<Callback<u16>>::new());

        assert!(list.is_empty());
        assert_eq!(list.call(1), Ok(()));
    }
}
