// crates/cf_foundation/src/memory.rs

//! 内存对齐工具
//!
//! 提供基于 std::alloc 的真实对齐缓冲区 AlignedVec，满足 SIMD 打包
//! 访问（64 字节 = AVX-512 / 缓存行）。另提供 SharedRows：
//! 按行分块并行写入的逃逸舱口，供模板遍历内核使用。

use bytemuck::Pod;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// 对齐字节数（缓存行 / AVX-512）
pub const CACHE_ALIGN: usize = 64;

// ============================================================================
// AlignedVec
// ============================================================================

/// 64 字节对齐的连续缓冲区
///
/// 与 `Vec<T>` 的区别仅在于分配对齐保证，语义上等价于定长切片。
/// 长度在创建后只能通过 [`AlignedVec::resize`] 改变（重新分配并拷贝）。
pub struct AlignedVec<T: Pod + Default> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<T>,
}

unsafe impl<T: Pod + Default + Send> Send for AlignedVec<T> {}
unsafe impl<T: Pod + Default + Sync> Sync for AlignedVec<T> {}

impl<T: Pod + Default> AlignedVec<T> {
    /// 创建长度为 len 的零初始化缓冲区
    pub fn zeros(len: usize) -> Self {
        if len == 0 {
            return Self {
                ptr: std::ptr::null_mut(),
                len: 0,
                _marker: PhantomData,
            };
        }

        let layout = Self::layout_for(len);
        let ptr = unsafe { alloc_zeroed(layout) as *mut T };
        if ptr.is_null() {
            handle_alloc_error(layout);
        }
        debug_assert_eq!((ptr as usize) % CACHE_ALIGN, 0);

        Self {
            ptr,
            len,
            _marker: PhantomData,
        }
    }

    /// 从切片拷贝创建
    pub fn from_slice(data: &[T]) -> Self {
        let mut v = Self::zeros(data.len());
        v.as_mut_slice().copy_from_slice(data);
        v
    }

    /// 当前长度
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 只读切片视图
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// 可变切片视图
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.len == 0 {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// 调整长度（重新分配，内容截断或补零）
    pub fn resize(&mut self, new_len: usize) {
        if new_len == self.len {
            return;
        }
        let mut new_vec = Self::zeros(new_len);
        let n = self.len.min(new_len);
        new_vec.as_mut_slice()[..n].copy_from_slice(&self.as_slice()[..n]);
        *self = new_vec;
    }

    /// 全部填充指定值
    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }

    fn layout_for(len: usize) -> Layout {
        let size = len * std::mem::size_of::<T>();
        Layout::from_size_align(size, CACHE_ALIGN).expect("非法内存布局")
    }
}

impl<T: Pod + Default> Drop for AlignedVec<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                dealloc(self.ptr as *mut u8, Self::layout_for(self.len));
            }
        }
    }
}

impl<T: Pod + Default> Clone for AlignedVec<T> {
    fn clone(&self) -> Self {
        Self::from_slice(self.as_slice())
    }
}

impl<T: Pod + Default> Deref for AlignedVec<T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod + Default> DerefMut for AlignedVec<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Pod + Default + std::fmt::Debug> std::fmt::Debug for AlignedVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedVec")
            .field("len", &self.len)
            .finish()
    }
}

impl<T: Pod + Default + PartialEq> PartialEq for AlignedVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Pod + Default + Serialize> Serialize for AlignedVec<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

impl<'de, T: Pod + Default + Deserialize<'de>> Deserialize<'de> for AlignedVec<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = Vec::<T>::deserialize(deserializer)?;
        Ok(Self::from_slice(&data))
    }
}

// ============================================================================
// SharedRows
// ============================================================================

/// 按行分块的共享可变写入视图
///
/// 模板遍历内核将节点区间划分为固定分块并行执行，每个分块只写入
/// 自己行区间内的输出。借用检查器无法表达这种不相交性，
/// 因此通过本包装绕过。
///
/// # 安全约定
///
/// 调用方必须保证：同一元素区间在任意时刻至多被一个线程通过
/// [`SharedRows::slice_mut`] 访问。遍历内核按互不相交的行分块
/// 调度即满足该约定。
pub struct SharedRows<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<'a, T: Send> Send for SharedRows<'a, T> {}
unsafe impl<'a, T: Send> Sync for SharedRows<'a, T> {}

impl<'a, T> SharedRows<'a, T> {
    /// 包装一个独占切片
    pub fn new(data: &'a mut [T]) -> Self {
        Self {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            _marker: PhantomData,
        }
    }

    /// 总长度
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 取 `[start, start+len)` 的可变子切片
    ///
    /// # Safety
    ///
    /// 并发调用的区间必须互不相交，且不得越界。
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, start: usize, len: usize) -> &mut [T] {
        debug_assert!(start + len <= self.len);
        std::slice::from_raw_parts_mut(self.ptr.add(start), len)
    }

    /// 写入单个元素
    ///
    /// # Safety
    ///
    /// 同 [`SharedRows::slice_mut`]：同一下标不得并发写入。
    #[inline]
    pub unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.len);
        *self.ptr.add(index) = value;
    }

    /// 只读切片视图
    ///
    /// # Safety
    ///
    /// 读取的元素不得与任何并发写入重叠。预计算循环依赖该约定：
    /// cycle 1 只读取 cycle 0 已定、本 cycle 不再写入的分量。
    #[inline]
    pub unsafe fn as_slice(&self) -> &[T] {
        std::slice::from_raw_parts(self.ptr, self.len)
    }
}

// ============================================================================
// 测试
// ============================================================================
