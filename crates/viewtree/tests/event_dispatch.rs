//! Integration tests for the two-phase modification protocol as seen through
//! the containers: hook and listener ordering, error aggregation, bubbling and
//! suppressed dispatch.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use viewtree::list::ListKind;
use viewtree::{
    element_listener, list_element_listener, DispatchStage, ElementEvent, ElementOrdering, EventOrigin,
    ListElementEvent, ListView, ListenerError, ModificationPhase, NodeHooks, RootOptions, SetView,
    ViewError, ViewResult,
};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Log = Arc<Mutex<Vec<String>>>;

struct RecordingHooks {
    name: &'static str,
    log: Log,
    fail_modifying: bool,
}

impl NodeHooks<ListKind<i32>> for RecordingHooks {
    fn on_modifying(&self, _: &ListElementEvent<i32>) -> ViewResult<()> {
        self.log.lock().push(format!("{}.on_modifying", self.name));
        if self.fail_modifying {
            Err(ViewError::IllegalState("hook refused"))
        } else {
            Ok(())
        }
    }

    fn on_modified(&self, _: &ListElementEvent<i32>) -> ViewResult<()> {
        self.log.lock().push(format!("{}.on_modified", self.name));
        Ok(())
    }
}

fn list_recorder(name: &'static str, log: &Log, fail_in: Option<ModificationPhase>) -> Arc<dyn viewtree::ListElementListener<i32>> {
    let log = Arc::clone(log);
    list_element_listener(move |phase, _: &ListElementEvent<i32>| {
        log.lock().push(format!("{name}.{phase:?}"));
        if fail_in == Some(phase) {
            Err(ListenerError::new(format!("{name} refused")))
        } else {
            Ok(())
        }
    })
}

#[test]
fn test_phase_ordering_across_views() {
    setup();
    let log: Log = Arc::default();
    let list = ListView::from_vec(vec![1, 2, 3]);
    let sub = list.sub_list(1, 3).unwrap();
    sub.set_hooks(Some(Arc::new(RecordingHooks {
        name: "sub",
        log: Arc::clone(&log),
        fail_modifying: false,
    })))
    .unwrap();
    sub.add_list_element_listener(list_recorder("sub", &log, None)).unwrap();
    list.add_list_element_listener(list_recorder("root", &log, None)).unwrap();

    sub.push(4).unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "sub.on_modifying",
            "sub.Modifying",
            "root.Modifying",
            "root.Modified",
            "sub.Modified",
            "sub.on_modified",
        ]
    );
}

#[test]
fn test_listeners_see_state_before_and_after() {
    setup();
    let list = ListView::from_vec(vec![1, 2, 3]);
    let observed = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&observed);
    let reader = list.clone();
    list.add_list_element_listener(list_element_listener(move |phase, _: &ListElementEvent<i32>| {
        recorder.lock().push((phase, reader.len().map_err(|err| ListenerError::new(err.to_string()))?));
        Ok(())
    }))
    .unwrap();

    list.push(4).unwrap();
    assert_eq!(
        *observed.lock(),
        vec![(ModificationPhase::Modifying, 3), (ModificationPhase::Modified, 4)]
    );
}

#[test]
fn test_failing_listener_does_not_stop_the_modification() {
    setup();
    let log: Log = Arc::default();
    let list = ListView::from_vec(vec![1]);
    let sub = list.sub_list(0, 1).unwrap();
    sub.add_list_element_listener(list_recorder("first", &log, Some(ModificationPhase::Modifying)))
        .unwrap();
    sub.add_list_element_listener(list_recorder("second", &log, None)).unwrap();
    list.add_list_element_listener(list_recorder("root", &log, None)).unwrap();

    let err = sub.push(2).unwrap_err();

    assert_eq!(err.phase(), Some(ModificationPhase::Modifying));
    assert!(matches!(
        err,
        ViewError::Modification {
            stage: DispatchStage::Listeners,
            ..
        }
    ));
    assert!(matches!(err.root_cause(), ViewError::Listener(_)));
    assert_eq!(list.to_vec().unwrap(), vec![1, 2]);
    // The failure ends the listener stage of the sublist; bubbling and the
    // mutation still happen.
    assert_eq!(
        *log.lock(),
        vec![
            "first.Modifying",
            "root.Modifying",
            "root.Modified",
            "first.Modified",
            "second.Modified",
        ]
    );
}

#[test]
fn test_post_phase_failure_is_reported_after_the_mutation() {
    setup();
    let log: Log = Arc::default();
    let list = ListView::from_vec(vec![1]);
    list.add_list_element_listener(list_recorder("root", &log, Some(ModificationPhase::Modified)))
        .unwrap();

    let err = list.remove_at(0).unwrap_err();
    assert_eq!(err.phase(), Some(ModificationPhase::Modified));
    assert!(list.is_empty().unwrap());
}

#[test]
fn test_failing_hook_still_bubbles() {
    setup();
    let log: Log = Arc::default();
    let list = ListView::from_vec(vec![1, 2]);
    let sub = list.sub_list(0, 2).unwrap();
    sub.set_hooks(Some(Arc::new(RecordingHooks {
        name: "sub",
        log: Arc::clone(&log),
        fail_modifying: true,
    })))
    .unwrap();
    list.add_list_element_listener(list_recorder("root", &log, None)).unwrap();

    let err = sub.insert(0, 0).unwrap_err();
    assert!(matches!(
        err,
        ViewError::Modification {
            stage: DispatchStage::Hook,
            ..
        }
    ));
    assert!(log.lock().contains(&"root.Modified".to_string()));
    assert_eq!(list.to_vec().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_listener_modifying_the_collection_aborts_the_write() {
    setup();
    let set = SetView::from_elements(ElementOrdering::Sorted, [1, 2]);
    let writer = set.clone();
    let fired = Arc::new(AtomicBool::new(false));
    let once = Arc::clone(&fired);
    set.add_element_listener(element_listener(move |phase, _: &ElementEvent<i32>| {
        if phase == ModificationPhase::Modifying && !once.swap(true, Ordering::SeqCst) {
            writer
                .insert(100)
                .map_err(|err| ListenerError::new(err.to_string()))?;
        }
        Ok(())
    }))
    .unwrap();

    let err = set.insert(5).unwrap_err();
    assert!(err.is_comodification());
    assert!(fired.load(Ordering::SeqCst));
    assert_eq!(set.to_vec().unwrap(), vec![1, 2, 100]);
}

#[test]
fn test_bubbled_events_keep_their_cause() {
    setup();
    let list = ListView::from_vec(vec![1, 2, 3]);
    let sub = list.sub_list(1, 2).unwrap();
    let origins = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&origins);
    list.add_list_element_listener(list_element_listener(move |phase, event: &ListElementEvent<i32>| {
        if phase == ModificationPhase::Modifying {
            recorder.lock().push((event.origin(), event.cause().is_some(), event.original().origin()));
        }
        Ok(())
    }))
    .unwrap();

    sub.push(9).unwrap();
    list.push(10).unwrap();
    assert_eq!(
        *origins.lock(),
        vec![
            (EventOrigin::Bubbled, true, EventOrigin::Direct),
            (EventOrigin::Direct, false, EventOrigin::Direct),
        ]
    );
}

#[test]
fn test_repeated_registration_counts() {
    setup();
    let list = ListView::from_vec(vec![0]);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let listener = list_element_listener(move |phase, _: &ListElementEvent<i32>| {
        if phase == ModificationPhase::Modified {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    });
    list.add_list_element_listener(Arc::clone(&listener)).unwrap();
    list.add_list_element_listener(Arc::clone(&listener)).unwrap();

    list.push(1).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert!(list.remove_list_element_listener(&listener).unwrap());
    list.push(2).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert!(list.remove_list_element_listener(&listener).unwrap());
    assert!(!list.remove_list_element_listener(&listener).unwrap());
}

#[test]
fn test_suppressed_dispatch() {
    setup();
    let list: ListView<i32> = ListView::with_options(RootOptions::default().with_dispatchable(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    list.add_list_element_listener(list_element_listener(move |_, _: &ListElementEvent<i32>| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }))
    .unwrap();

    list.extend([1, 2, 3]).unwrap();
    list.sub_list(0, 2).unwrap().clear().unwrap();
    assert_eq!(list.to_vec().unwrap(), vec![3]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
