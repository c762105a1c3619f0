//! 调用分发控制器
//!
//! 每个代理实例拥有一个 [`DispatchController`]，代理收到的每一次调用都交给它处理。
//!
//! 控制器有两种模式：
//! - `Normal`：收集匹配的切面与最新的打桩，构建拦截器链并执行；
//! - `Recording`：下一次调用不会执行真实实现，只记录它的操作描述，然后立即回到 `Normal`。
//!
//! 状态放在 `parking_lot::Mutex` 中，但通知、真实实现和录制钩子执行期间不持有锁，
//! 因此钩子可以重入地注册打桩。

use crate::advice::Advice;
use crate::aspect::Aspect;
use crate::chain::{InterceptorChain, Terminal};
use crate::config::{DefaultAnswer, ProxySettings};
use crate::defaults::DefaultValueSynthesizer;
use crate::descriptor::OperationDescriptor;
use crate::error::{ProxyError, ProxyResult, Throwable};
use crate::pointcut::Pointcut;
use crate::value::{Arguments, Value};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 录制钩子：在触发调用中被同步执行，用录制到的操作描述完成打桩
pub type ArmHook =
    Box<dyn FnOnce(&DispatchController, &OperationDescriptor) -> ProxyResult<()> + Send>;

enum Recorder {
    /// 期望形式：只记录操作描述，由调用方随后取走
    Capture,
    /// 配置形式：录制到操作描述后立即执行钩子
    Arm(ArmHook),
}

enum Mode {
    Normal,
    Recording(Recorder),
}

/// 锁内决定、锁外执行的下一步
enum Step {
    Record(Option<ArmHook>),
    Execute(Vec<Arc<Aspect>>, Vec<Arc<Aspect>>),
}

struct State {
    mode: Mode,
    pending: Option<OperationDescriptor>,
    aspects: Vec<Arc<Aspect>>,
    stubs: Vec<Arc<Aspect>>,
}

/// 调用分发控制器
pub struct DispatchController {
    owner: String,
    has_target: bool,
    settings: ProxySettings,
    synthesizer: Arc<dyn DefaultValueSynthesizer>,
    state: Mutex<State>,
}

impl DispatchController {
    pub fn new(
        owner: impl Into<String>,
        has_target: bool,
        settings: ProxySettings,
        synthesizer: Arc<dyn DefaultValueSynthesizer>,
        aspects: Vec<Arc<Aspect>>,
    ) -> Self {
        Self {
            owner: owner.into(),
            has_target,
            settings,
            synthesizer,
            state: Mutex::new(State {
                mode: Mode::Normal,
                pending: None,
                aspects,
                stubs: Vec::new(),
            }),
        }
    }

    /// 代理的所有者名称
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// 是否包装了真实对象（spy / AOP 代理）
    pub fn has_target(&self) -> bool {
        self.has_target
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state.lock().mode, Mode::Recording(_))
    }

    pub fn aspect_count(&self) -> usize {
        self.state.lock().aspects.len()
    }

    pub fn stub_count(&self) -> usize {
        self.state.lock().stubs.len()
    }

    // ------------------------------------------------------------------
    // 注册
    // ------------------------------------------------------------------

    /// 注册一个切面（追加到注册顺序末尾）
    pub fn register_aspect(&self, aspect: Aspect) {
        tracing::debug!(
            proxy = %self.owner,
            aspect = aspect.name(),
            pointcut = ?aspect.pointcut(),
            advices = aspect.advices().len(),
            "Registering aspect"
        );
        self.state.lock().aspects.push(Arc::new(aspect));
    }

    /// 为一个操作注册打桩
    ///
    /// 同一个操作的新打桩遮蔽旧打桩，旧打桩不会被删除。
    pub fn register_stub(&self, selector: OperationDescriptor, advice: Advice) {
        tracing::debug!(
            proxy = %self.owner,
            operation = %selector,
            advice = advice.name(),
            "Registering stub"
        );
        let name = format!("stub:{}", selector);
        let stub = Aspect::of(name, Pointcut::exact(selector), advice);
        self.state.lock().stubs.push(Arc::new(stub));
    }

    // ------------------------------------------------------------------
    // 录制
    // ------------------------------------------------------------------

    /// 进入录制模式（期望形式），下一次调用的操作描述由 [`take_pending_selector`] 取走
    ///
    /// [`take_pending_selector`]: DispatchController::take_pending_selector
    pub fn begin_capture(&self) -> ProxyResult<()> {
        self.begin(Recorder::Capture)
    }

    /// 进入录制模式（配置形式），下一次调用时执行 `hook`
    pub fn begin_arming(&self, hook: ArmHook) -> ProxyResult<()> {
        self.begin(Recorder::Arm(hook))
    }

    fn begin(&self, recorder: Recorder) -> ProxyResult<()> {
        let mut state = self.state.lock();
        if matches!(state.mode, Mode::Recording(_)) || state.pending.is_some() {
            return Err(ProxyError::AlreadyRecording(self.owner.clone()));
        }
        tracing::debug!(proxy = %self.owner, "Entering recording mode");
        state.mode = Mode::Recording(recorder);
        Ok(())
    }

    /// 取走录制到的操作描述，并清除录制状态
    ///
    /// 录制期间没有发生调用时返回 [`ProxyError::NothingRecorded`]。
    pub fn take_pending_selector(&self) -> ProxyResult<OperationDescriptor> {
        let mut state = self.state.lock();
        state.mode = Mode::Normal;
        state
            .pending
            .take()
            .ok_or_else(|| ProxyError::NothingRecorded(self.owner.clone()))
    }

    /// 放弃未完成的录制请求
    pub fn cancel_recording(&self) {
        let mut state = self.state.lock();
        if matches!(state.mode, Mode::Recording(_)) || state.pending.is_some() {
            tracing::debug!(proxy = %self.owner, "Recording cancelled");
        }
        state.mode = Mode::Normal;
        state.pending = None;
    }

    // ------------------------------------------------------------------
    // 分发
    // ------------------------------------------------------------------

    /// 分发一次类型擦除的调用
    ///
    /// `target` 是调用真实实现的能力；无目标的 mock 传入 `None`。
    pub fn invoke(
        &self,
        operation: &OperationDescriptor,
        args: Arguments,
        target: Option<&Terminal<'_>>,
    ) -> Result<Value, Throwable> {
        let step = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut state.mode, Mode::Normal) {
                Mode::Recording(recorder) => {
                    Step::Record(self.record(&mut state, recorder, operation))
                }
                Mode::Normal => Step::Execute(state.aspects.clone(), state.stubs.clone()),
            }
        };

        match step {
            Step::Record(hook) => {
                if let Some(hook) = hook {
                    hook(self, operation)?;
                }
                Ok(self.default_value(operation))
            }
            Step::Execute(aspects, stubs) => {
                self.execute(operation, args, target, &aspects, &stubs)
            }
        }
    }

    /// 分发一次带类型的调用：返回值为 null 时映射为 `R::default()`
    pub fn dispatch<R>(
        &self,
        operation: &OperationDescriptor,
        args: Arguments,
        target: Option<&dyn Fn(&Arguments) -> Result<R, Throwable>>,
    ) -> Result<R, Throwable>
    where
        R: Any + Clone + Default + Send + Sync,
    {
        let erased;
        let terminal: Option<&Terminal<'_>> = match target {
            Some(call) => {
                erased = move |args: &Arguments| call(args).map(Value::new);
                Some(&erased as &Terminal<'_>)
            }
            None => None,
        };
        self.invoke(operation, args, terminal)?.cast_or_default()
    }

    /// 分发一次带类型的调用，返回类型不要求 `Default`
    ///
    /// 返回值为 null 时（mock 上未打桩、录制中的触发调用）得到 [`ProxyError::NullValue`]。
    /// 录制中的触发调用仍然完成录制，调用方应丢弃它的结果。
    pub fn dispatch_required<R>(
        &self,
        operation: &OperationDescriptor,
        args: Arguments,
        target: Option<&dyn Fn(&Arguments) -> Result<R, Throwable>>,
    ) -> Result<R, Throwable>
    where
        R: Any + Clone + Send + Sync,
    {
        let erased;
        let terminal: Option<&Terminal<'_>> = match target {
            Some(call) => {
                erased = move |args: &Arguments| call(args).map(Value::new);
                Some(&erased as &Terminal<'_>)
            }
            None => None,
        };
        self.invoke(operation, args, terminal)?.cast()
    }

    /// 处理录制模式下的调用，返回需要在锁外执行的钩子
    fn record(
        &self,
        state: &mut State,
        recorder: Recorder,
        operation: &OperationDescriptor,
    ) -> Option<ArmHook> {
        tracing::debug!(proxy = %self.owner, operation = %operation, "Recorded invocation");
        match recorder {
            Recorder::Capture => {
                state.pending = Some(operation.clone());
                None
            }
            Recorder::Arm(hook) => Some(hook),
        }
    }

    fn execute(
        &self,
        operation: &OperationDescriptor,
        args: Arguments,
        target: Option<&Terminal<'_>>,
        aspects: &[Arc<Aspect>],
        stubs: &[Arc<Aspect>],
    ) -> Result<Value, Throwable> {
        let mut advices: Vec<Advice> = aspects
            .iter()
            .filter(|aspect| aspect.matches(operation))
            .flat_map(|aspect| aspect.advices().iter().cloned())
            .collect();
        // 最新注册的打桩生效，并位于链的最内层
        if let Some(stub) = stubs.iter().rev().find(|stub| stub.matches(operation)) {
            advices.extend(stub.advices().iter().cloned());
        }

        tracing::trace!(
            proxy = %self.owner,
            operation = %operation,
            advices = advices.len(),
            "Dispatching call"
        );

        if advices.is_empty() {
            return match target {
                Some(target) => target(&args),
                None if self.settings.default_answer == DefaultAnswer::Fail => {
                    Err(ProxyError::Unstubbed(operation.to_string()).into())
                }
                None => Ok(self.default_value(operation)),
            };
        }

        let synthesize = |_: &Arguments| -> Result<Value, Throwable> {
            Ok(self.default_value(operation))
        };
        let terminal: &Terminal<'_> = match target {
            Some(target) => target,
            None => &synthesize,
        };
        InterceptorChain::new(operation, advices, terminal).execute(args)
    }

    /// 声明返回类型的默认值，无法合成时为 null 占位
    fn default_value(&self, operation: &OperationDescriptor) -> Value {
        self.synthesizer
            .synthesize(operation.return_type())
            .unwrap_or_else(Value::null)
    }
}

impl fmt::Debug for DispatchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DispatchController")
            .field("owner", &self.owner)
            .field("has_target", &self.has_target)
            .field("recording", &matches!(state.mode, Mode::Recording(_)))
            .field("aspects", &state.aspects.len())
            .field("stubs", &state.stubs.len())
            .finish()
    }
}
