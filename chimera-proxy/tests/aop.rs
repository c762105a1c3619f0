//! AOP 代理场景测试

use chimera_proxy::prelude::*;
use chimera_proxy::{exception_logging_aspect, logging_aspect, performance_aspect};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type TestResult = Result<(), Box<dyn Error + Send + Sync>>;

#[proxy]
pub trait Set: Send + Sync {
    fn size(&self) -> Result<usize, Throwable>;

    fn add(&self, item: String) -> Result<bool, Throwable>;

    fn contains(&self, item: String) -> Result<bool, Throwable>;

    fn find_age(&self, name: String) -> Result<Option<i64>, Throwable>;
}

#[derive(Default)]
struct HashStringSet {
    items: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl HashStringSet {
    fn of(items: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Set for HashStringSet {
    fn size(&self) -> Result<usize, Throwable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.lock().len())
    }

    fn add(&self, item: String) -> Result<bool, Throwable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.lock().insert(item))
    }

    fn contains(&self, item: String) -> Result<bool, Throwable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.lock().contains(&item))
    }

    fn find_age(&self, name: String) -> Result<Option<i64>, Throwable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if name.is_empty() {
            return Err(Throwable::msg("empty name"));
        }
        Ok(self.items.lock().contains(&name).then_some(42))
    }
}

fn size_operation() -> OperationDescriptor {
    SetProxy::operation("size").unwrap().clone()
}

#[test]
fn test_before_on_single_operation() -> TestResult {
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);
    let aspect = Aspect::of(
        "Before1",
        Pointcut::exact(size_operation()),
        Advice::before(move |_| {
            seen.lock().push("before1".to_string());
            Ok(())
        }),
    );
    let set = SetProxy::from_builder(
        SetProxy::builder().aspect(aspect),
        Some(HashStringSet::of(&["a", "b"])),
    );

    assert_eq!(set.size()?, 2);
    assert_eq!(*log.lock(), vec!["before1"]);

    // 其他操作不受影响
    assert!(set.contains("a".to_string())?);
    assert_eq!(*log.lock(), vec!["before1"]);
    Ok(())
}

#[test]
fn test_bind_before_with_when() -> TestResult {
    let log = Arc::new(Mutex::new(Vec::new()));
    let target = HashStringSet::of(&["a", "b", "c"]);
    let set = SetProxy::spy(target.clone());

    let seen = Arc::clone(&log);
    bind(&set)
        .do_before(move |jp| {
            seen.lock().push(format!("before1:{}", jp.name()));
            Ok(())
        })
        .when()?
        .size()?;
    // 录制调用不触达真实实现
    assert_eq!(target.calls(), 0);

    assert_eq!(set.size()?, 3);
    assert_eq!(*log.lock(), vec!["before1:size"]);
    assert_eq!(target.calls(), 1);
    Ok(())
}

#[test]
fn test_around_without_proceed_skips_target() -> TestResult {
    let target = HashStringSet::of(&["a"]);
    let set = SetProxy::spy(target.clone());

    bind(&set)
        .do_around(|_| Ok(Value::new(100usize)))
        .when()?
        .size()?;

    assert_eq!(set.size()?, 100);
    assert_eq!(target.calls(), 0);

    let mock = SetProxy::mock();
    bind(&mock).do_around(|_| Ok(Value::new(true))).named("add")?.register();
    assert!(mock.add("x".to_string())?);
    Ok(())
}

#[test]
fn test_around_proceeding_twice_runs_target_twice() -> TestResult {
    let target = HashStringSet::of(&[]);
    let set = SetProxy::spy(target.clone());
    let results = Arc::new(Mutex::new(Vec::new()));

    let seen = Arc::clone(&results);
    bind(&set)
        .do_around(move |invocation| {
            let first = invocation.proceed()?.cast::<bool>()?;
            let second = invocation.proceed()?.cast::<bool>()?;
            seen.lock().push((first, second));
            Ok(Value::new(first))
        })
        .named("add")?
        .register();

    assert!(set.add("x".to_string())?);
    assert_eq!(target.calls(), 2);
    // 第二次执行看到第一次的副作用
    assert_eq!(*results.lock(), vec![(true, false)]);
    Ok(())
}

#[test]
fn test_advice_order_across_aspects() -> TestResult {
    let log = Arc::new(Mutex::new(Vec::new()));
    let tracer = |label: &'static str| {
        let seen = Arc::clone(&log);
        Aspect::of(
            label,
            Pointcut::all(),
            Advice::around(move |invocation| {
                seen.lock().push(format!("{label}-pre"));
                let result = invocation.proceed();
                seen.lock().push(format!("{label}-post"));
                result
            }),
        )
    };
    let set = SetProxy::from_builder(
        SetProxy::builder().aspects(vec![tracer("A1"), tracer("A2")]),
        Some(HashStringSet::of(&["a"])),
    );

    set.size()?;
    assert_eq!(*log.lock(), vec!["A1-pre", "A2-pre", "A2-post", "A1-post"]);
    Ok(())
}

#[test]
fn test_after_throwing_and_after() -> TestResult {
    let log = Arc::new(Mutex::new(Vec::new()));
    let set = SetProxy::spy(HashStringSet::of(&["ann"]));

    let seen = Arc::clone(&log);
    bind(&set)
        .do_after_throwing(move |jp, error| {
            seen.lock().push(format!("threw:{}:{}", jp.name(), error));
        })
        .named("find_*")?
        .register();
    let seen = Arc::clone(&log);
    bind(&set)
        .do_after(move |jp, outcome| {
            seen.lock().push(format!("after:{}:{}", jp.name(), outcome.is_ok()));
        })
        .all_methods();

    assert_eq!(set.find_age("ann".to_string())?, Some(42));
    let err = set.find_age(String::new()).unwrap_err();
    assert_eq!(err.message(), "empty name");

    assert_eq!(
        *log.lock(),
        vec![
            "after:find_age:true",
            "after:find_age:false",
            "threw:find_age:empty name",
        ]
    );
    Ok(())
}

#[test]
fn test_return_type_widening() -> TestResult {
    let hits = Arc::new(AtomicUsize::new(0));
    let set = SetProxy::spy(HashStringSet::of(&["ann"]));

    let counter = Arc::clone(&hits);
    bind(&set)
        .do_before(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .return_type(&[TypeDesc::of::<i64>()])?
        .register();

    set.find_age("ann".to_string())?;
    set.size()?;
    set.contains("ann".to_string())?;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_after_returning_can_inspect_value() -> TestResult {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let set = SetProxy::spy(HashStringSet::of(&["a"]));

    let log = Arc::clone(&seen);
    bind(&set)
        .do_after_returning(move |jp, value| {
            let item: String = jp.arg(0)?;
            log.lock().push(format!("{}={}", item, value.cast::<bool>()?));
            Ok(())
        })
        .named("contains")?
        .register();

    set.contains("a".to_string())?;
    set.contains("z".to_string())?;
    assert_eq!(*seen.lock(), vec!["a=true", "z=false"]);
    Ok(())
}

#[test]
fn test_predefined_aspects_are_transparent() -> TestResult {
    let set = SetProxy::from_builder(
        SetProxy::builder()
            .aspect(logging_aspect(Pointcut::all()))
            .aspect(performance_aspect(Duration::from_secs(5), Pointcut::all()))
            .aspect(exception_logging_aspect(Pointcut::all())),
        Some(HashStringSet::of(&["a"])),
    );

    assert_eq!(set.size()?, 1);
    let err = set.find_age(String::new()).unwrap_err();
    assert_eq!(err.message(), "empty name");
    Ok(())
}

#[test]
fn test_stub_and_aspect_on_same_proxy() -> TestResult {
    let log = Arc::new(Mutex::new(Vec::new()));
    let set = SetProxy::mock();

    let seen = Arc::clone(&log);
    bind(&set)
        .do_before(move |jp| {
            seen.lock().push(jp.name().to_string());
            Ok(())
        })
        .all_methods();
    do_return(9usize).when(&set)?.size()?;

    assert_eq!(set.size()?, 9);
    assert!(!set.contains("a".to_string())?);
    assert_eq!(*log.lock(), vec!["size", "contains"]);
    Ok(())
}

pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct Polite;

impl Greeter for Polite {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {}", name)
    }
}

#[proxy]
pub trait GreeterFactory: Send + Sync {
    #[no_default]
    fn create(&self) -> Result<Arc<dyn Greeter>, Throwable>;

    fn created(&self) -> Result<usize, Throwable>;
}

#[derive(Default)]
struct PoliteFactory {
    created: AtomicUsize,
}

impl GreeterFactory for PoliteFactory {
    fn create(&self) -> Result<Arc<dyn Greeter>, Throwable> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Polite))
    }

    fn created(&self) -> Result<usize, Throwable> {
        Ok(self.created.load(Ordering::SeqCst))
    }
}

#[test]
fn test_no_default_return_on_spy_and_mock() -> TestResult {
    let calls = Arc::new(AtomicUsize::new(0));
    let factory = GreeterFactoryProxy::spy(Arc::new(PoliteFactory::default()));

    let counter = Arc::clone(&calls);
    bind(&factory)
        .do_before(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .all_methods();

    assert_eq!(factory.create()?.greet("ann"), "Hello, ann");
    assert_eq!(factory.created()?, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // mock 上未打桩时没有默认值可用
    let mock = GreeterFactoryProxy::mock();
    let err = match mock.create() {
        Ok(_) => panic!("expected a missing default"),
        Err(err) => err,
    };
    assert!(matches!(
        err.downcast_ref::<ProxyError>(),
        Some(ProxyError::NullValue { .. })
    ));

    let polite: Arc<dyn Greeter> = Arc::new(Polite);
    when(&mock, |f| f.create())?.then_return(polite);
    assert_eq!(mock.create()?.greet("bob"), "Hello, bob");
    Ok(())
}
